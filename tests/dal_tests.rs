use std::collections::BTreeSet;
use std::sync::Arc;

use mamdb::{
    allocator::AllocatorState,
    query,
    repo::{self, FacadeAutoIncrement, FacadeError, FacadeModel},
    types::{CollectionName, Kitten},
};

async fn setup(uri: &str, auto_increment: Option<(i64, i64)>) -> (repo::Repository, FacadeModel<Kitten>) {
    let repo = repo::connect(uri).await.unwrap();
    let kittens = FacadeModel::<Kitten>::new(repo.clone()).unwrap();

    if let Some((start_at, increment)) = auto_increment {
        FacadeAutoIncrement::new(repo.clone(), kittens.collection().clone())
            .register(start_at, increment)
            .await
            .unwrap();
    }

    (repo, kittens)
}

fn kitten(name: &str, age: i64, height: i64, birth: i64) -> Kitten {
    Kitten::new(name)
        .with_age(age)
        .with_height(height)
        .with_birth(birth)
}

#[tokio::test]
async fn sequential_inserts_get_consecutive_idx() {
    let (_repo, kittens) = setup("memory://t", Some((1, 1))).await;

    let mut issued = Vec::new();
    for name in ["a", "b", "c"] {
        let k = kittens.insert(&Kitten::new(name).with_age(1)).await.unwrap();
        assert!(k.id.is_some());
        issued.push(k.idx.unwrap());
    }

    assert_eq!(issued, vec![1, 2, 3]);
}

#[tokio::test]
async fn custom_start_and_increment() {
    let (_repo, kittens) = setup("memory://t", Some((10, 5))).await;

    let mut issued = Vec::new();
    for _ in 0..4 {
        let k = kittens.insert(&Kitten::new("mk3").with_age(1)).await.unwrap();
        issued.push(k.idx.unwrap());
    }

    assert_eq!(issued, vec![10, 15, 20, 25]);
}

#[tokio::test]
async fn insert_without_allocator_leaves_idx_unset() {
    let (_repo, kittens) = setup("memory://t", None).await;

    let k = kittens.insert(&Kitten::new("mk3").with_age(1)).await.unwrap();
    assert_eq!(k.idx, None);
    assert_eq!(kittens.find_all().await.unwrap(), vec![k]);
}

#[tokio::test]
async fn missing_name_is_rejected() {
    let (repo, kittens) = setup("memory://t", Some((1, 1))).await;

    let res = kittens.insert(&Kitten::new("").with_age(1)).await;
    assert!(matches!(res, Err(FacadeError::ValidationError(f)) if f == "name"));

    let res = kittens.insert(&Kitten::new("mk3")).await;
    assert!(matches!(res, Err(FacadeError::ValidationError(f)) if f == "age"));

    assert!(kittens.find_all().await.unwrap().is_empty());

    // No value was consumed by the rejected records
    let state = FacadeAutoIncrement::new(repo, kittens.collection().clone())
        .state()
        .await
        .unwrap();
    assert_eq!(
        state,
        AllocatorState::Registered {
            start_at: 1,
            increment: 1,
            last: None
        }
    );
}

#[tokio::test]
async fn find_by_field() {
    let (_repo, kittens) = setup("memory://t", Some((1, 1))).await;

    for name in ["mk3", "nabi", "mk3", "coco", "mk3"] {
        kittens.insert(&Kitten::new(name).with_age(2)).await.unwrap();
    }

    let found = kittens.find_all_by_field("name", "mk3").await.unwrap();
    let idx: Vec<i64> = found.iter().filter_map(|k| k.idx).collect();
    assert_eq!(idx, vec![1, 3, 5]);

    let first = kittens.find_one_by_field("name", "mk3").await.unwrap();
    assert_eq!(first.and_then(|k| k.idx), Some(1));

    assert!(kittens.find_one_by_field("name", "tom").await.unwrap().is_none());
    assert!(kittens.find_all_by_field("name", "tom").await.unwrap().is_empty());

    assert_eq!(kittens.find_all().await.unwrap().len(), 5);
}

#[tokio::test]
async fn count_with_inclusive_bounds() {
    let (_repo, kittens) = setup("memory://t", None).await;

    kittens
        .insert_many([
            kitten("a", 1, 150, 100),
            kitten("b", 2, 190, 150),
            kitten("c", 3, 195, 5000),
        ])
        .await
        .unwrap();

    let filter = query::Filter::new()
        .between("height", 180, 200)
        .unwrap()
        .between("birth", 100, 200)
        .unwrap();
    assert_eq!(kittens.count_in_range(&filter).await.unwrap(), 1);

    // Both ends are inclusive
    let filter = query::Filter::new()
        .between("height", 150, 190)
        .unwrap()
        .between("birth", 100, 150)
        .unwrap();
    assert_eq!(kittens.count_in_range(&filter).await.unwrap(), 2);

    assert_eq!(kittens.count_in_range(&query::Filter::new()).await.unwrap(), 3);
}

#[tokio::test]
async fn count_matches_fixture() {
    let (_repo, kittens) = setup("memory://t", Some((1, 1))).await;

    // Every fourth kitten falls into both ranges
    let records = (0..40).map(|i| {
        if i % 4 == 0 {
            kitten("in", 1, 180 + (i % 21), 1_000 + i)
        } else if i % 2 == 0 {
            kitten("tall", 1, 210, 1_000 + i)
        } else {
            kitten("old", 1, 190, 10)
        }
    });
    kittens.insert_many(records).await.unwrap();

    let filter = query::Filter::new()
        .between("height", 180, 200)
        .unwrap()
        .between("birth", 1_000, 2_000)
        .unwrap();

    assert_eq!(kittens.count_in_range(&filter).await.unwrap(), 10);
}

#[tokio::test]
async fn disconnect_twice_then_use() {
    let (repo, kittens) = setup("memory://t", None).await;

    repo::disconnect(&repo).await;
    repo::disconnect(&repo).await;

    assert!(matches!(
        kittens.find_all().await,
        Err(FacadeError::ConnectionError(_))
    ));
    assert!(matches!(
        kittens.insert(&Kitten::new("mk3").with_age(1)).await,
        Err(FacadeError::ConnectionError(_))
    ));
}

#[tokio::test]
async fn bad_uri_is_a_connection_error() {
    assert!(matches!(
        repo::connect("redis://localhost").await,
        Err(FacadeError::ConnectionError(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_get_unique_idx() {
    let (_repo, kittens) = setup("memory://t", Some((1, 1))).await;
    let kittens = Arc::new(kittens);

    let handles: Vec<_> = (0..64)
        .map(|i| {
            let kittens = kittens.clone();
            tokio::spawn(async move {
                kittens
                    .insert(&Kitten::new(&format!("k{i}")).with_age(i))
                    .await
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;

    let issued: BTreeSet<i64> = results
        .into_iter()
        .map(|r| r.unwrap().unwrap().idx.unwrap())
        .collect();

    assert_eq!(issued, (1..=64).collect::<BTreeSet<_>>());
}

#[tokio::test]
async fn counter_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let uri = format!("file://{}", dir.path().join("mam.json").display());

    {
        let (repo, kittens) = setup(&uri, Some((1, 1))).await;
        kittens.insert(&Kitten::new("a").with_age(1)).await.unwrap();
        kittens.insert(&Kitten::new("b").with_age(1)).await.unwrap();
        repo::disconnect(&repo).await;
    }

    let (_repo, kittens) = setup(&uri, Some((1, 1))).await;
    let k = kittens.insert(&Kitten::new("c").with_age(1)).await.unwrap();

    assert_eq!(k.idx, Some(3));
    assert_eq!(kittens.find_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn failed_batch_leaves_nothing() {
    let (_repo, kittens) = setup("memory://t", Some((1, 1))).await;

    let res = kittens
        .insert_many([
            Kitten::new("a").with_age(1),
            Kitten::new("b").with_age(1),
            Kitten::new("").with_age(1),
            Kitten::new("d").with_age(1),
        ])
        .await;

    assert!(matches!(res, Err(FacadeError::ValidationError(_))));
    assert!(kittens.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn collection_name_is_case_insensitive() {
    let (repo, kittens) = setup("memory://t", None).await;
    kittens.insert(&Kitten::new("mk3").with_age(1)).await.unwrap();

    let upper = FacadeModel::<Kitten>::with_collection(
        repo,
        CollectionName::try_new("KITTENS").unwrap(),
    );

    assert_eq!(upper.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn allocator_lifecycle() {
    let (repo, kittens) = setup("memory://t", None).await;
    let ai = FacadeAutoIncrement::new(repo, kittens.collection().clone());

    assert_eq!(ai.state().await.unwrap(), AllocatorState::Unregistered);
    assert_eq!(ai.next_count().await.unwrap(), None);

    ai.register(100, 10).await.unwrap();
    assert_eq!(ai.next_count().await.unwrap(), Some(100));

    kittens.insert(&Kitten::new("a").with_age(1)).await.unwrap();
    assert_eq!(ai.next_count().await.unwrap(), Some(110));
    assert_eq!(
        ai.state().await.unwrap(),
        AllocatorState::Registered {
            start_at: 100,
            increment: 10,
            last: Some(100)
        }
    );

    ai.reset_count().await.unwrap();
    assert_eq!(ai.next_count().await.unwrap(), Some(100));
}

#[tokio::test]
async fn bad_increment_is_an_allocation_error() {
    let (repo, kittens) = setup("memory://t", None).await;
    let ai = FacadeAutoIncrement::new(repo, kittens.collection().clone());

    assert!(matches!(
        ai.register(1, 0).await,
        Err(FacadeError::AllocationError(_))
    ));
    assert_eq!(ai.state().await.unwrap(), AllocatorState::Unregistered);
}

#[tokio::test]
async fn reissued_idx_is_a_store_error() {
    let (repo, kittens) = setup("memory://t", Some((1, 1))).await;
    kittens.insert(&Kitten::new("a").with_age(1)).await.unwrap();

    FacadeAutoIncrement::new(repo, kittens.collection().clone())
        .reset_count()
        .await
        .unwrap();

    assert!(matches!(
        kittens.insert(&Kitten::new("b").with_age(1)).await,
        Err(FacadeError::StoreError(_))
    ));
    assert_eq!(kittens.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn equality_is_typed() {
    let (_repo, kittens) = setup("memory://t", Some((1, 1))).await;
    kittens.insert(&Kitten::new("mk3").with_age(2)).await.unwrap();

    assert!(kittens.find_all_by_field("idx", "1").await.unwrap().is_empty());
    assert!(kittens.find_all_by_field("name", 3).await.unwrap().is_empty());
    assert_eq!(kittens.find_all_by_field("idx", 1).await.unwrap().len(), 1);

    let filter = query::Filter::new()
        .and("name", query::Op::Geq(0.into()))
        .unwrap();
    assert_eq!(kittens.count_in_range(&filter).await.unwrap(), 0);
}

#[tokio::test]
async fn registering_over_duplicates_fails() {
    let (repo, kittens) = setup("memory://t", None).await;
    for _ in 0..2 {
        kittens.insert(&Kitten::new("mk3").with_age(2)).await.unwrap();
    }

    // Without a counter the records carry no idx, so the sequence field is free
    let ai = FacadeAutoIncrement::new(repo, kittens.collection().clone());
    ai.register(1, 1).await.unwrap();

    assert!(matches!(
        ai.register_field("name", 1, 1).await,
        Err(FacadeError::StoreError(_))
    ));
}
