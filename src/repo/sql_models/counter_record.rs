/// Row of the counter table, one per auto-increment registration that issued
/// at least one value.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CounterRecord {
    pub collection: String,
    pub field: String,
    /// Last issued value
    pub last_value: i64,
}
