//! Behavioural tests for the aggregation service over the in-memory adapters.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::{Map, Value, json};
use url::Url;
use zinezone::domain::ports::Collection;
use zinezone::domain::{
    AggregationService, ErrorCode, FlowerAsset, InvalidationBus, NewZine, ProfileSeed,
    ProfileUpdate, Session, TagSource, Topic, UserId, Zine, ZineId,
};
use zinezone::outbound::memory::{
    InMemoryDocumentStore, InMemoryObjectStore, OperationKind, StaticIdentityProvider,
};

type Service = AggregationService<InMemoryDocumentStore, InMemoryObjectStore>;

struct Harness {
    documents: Arc<InMemoryDocumentStore>,
    objects: Arc<InMemoryObjectStore>,
    service: Service,
}

impl Harness {
    fn bus(&self) -> &InvalidationBus {
        self.service.bus()
    }

    async fn signed_in(&self, name: &str) -> Session {
        let provider = StaticIdentityProvider::signed_in(user(name));
        let session = Session::resolve(&provider).await;
        self.service
            .ensure_own_profile(
                &session,
                ProfileSeed {
                    display_name: Some(name.to_owned()),
                    email: None,
                },
            )
            .await
            .expect("profile provisioned");
        session
    }

    async fn publish(&self, session: &Session, title: &str) -> Zine {
        self.service
            .create_zine(session, NewZine::titled(title), vec![0xFF, 0xD8])
            .await
            .expect("zine created")
    }

    fn insert_zine(&self, id: &str, artist: &str, day: u32) {
        self.documents.insert(
            Collection::Zines,
            id,
            fields(json!({
                "title": format!("Zine {id}"),
                "artistId": artist,
                "createdAt": format!("2024-01-{day:02}T00:00:00.000000000Z"),
            })),
        );
    }
}

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn user(name: &str) -> UserId {
    UserId::new(name).expect("valid user id")
}

#[fixture]
fn harness() -> Harness {
    let documents = Arc::new(InMemoryDocumentStore::new(Arc::new(DefaultClock)));
    let base = Url::parse("https://objects.test/").expect("valid base url");
    let objects = Arc::new(InMemoryObjectStore::new(base));
    let service = AggregationService::new(
        Arc::clone(&documents),
        Arc::clone(&objects),
        InvalidationBus::new(),
    );
    Harness {
        documents,
        objects,
        service,
    }
}

#[rstest]
#[tokio::test]
async fn created_zine_is_listed_once_for_its_artist(harness: Harness) {
    let ada = harness.signed_in("ada").await;

    let zine = harness.publish(&ada, "  Riso Nights  ").await;

    assert_eq!(zine.title, "Riso Nights");
    assert_eq!(zine.artist_id, user("ada"));
    assert!(zine.created_at.is_some());
    assert_eq!(
        zine.cover_image_url,
        format!("https://objects.test/zine-covers/{}.jpg", zine.id)
    );
    let cover_path = format!("zine-covers/{}.jpg", zine.id);
    assert_eq!(harness.objects.object(&cover_path), Some(vec![0xFF, 0xD8]));

    let listed = harness.service.list_zines_by_artist(&user("ada")).await;
    let hits = listed.iter().filter(|listed| listed.id == zine.id).count();
    assert_eq!(hits, 1);
    assert_eq!(harness.service.list_own_zines(&ada).await, listed);
}

#[rstest]
#[tokio::test]
async fn zines_are_listed_newest_first(harness: Harness) {
    let ada = harness.signed_in("ada").await;
    let first = harness.publish(&ada, "First").await;
    let second = harness.publish(&ada, "Second").await;

    let ids: Vec<ZineId> = harness
        .service
        .list_zines()
        .await
        .into_iter()
        .map(|zine| zine.id)
        .collect();

    assert_eq!(ids, vec![second.id, first.id]);
}

#[rstest]
#[tokio::test]
async fn anonymous_sessions_cannot_create_zines(harness: Harness) {
    let err = harness
        .service
        .create_zine(&Session::anonymous(), NewZine::titled("Nope"), Vec::new())
        .await
        .expect_err("sign in required");

    assert_eq!(err.code(), ErrorCode::Unauthenticated);
    assert!(harness.objects.paths().is_empty());
    assert!(harness.documents.is_empty(Collection::Zines));
}

#[rstest]
#[tokio::test]
async fn saving_is_idempotent_and_reversible(harness: Harness) {
    let ada = harness.signed_in("ada").await;
    let bea = harness.signed_in("bea").await;
    let zine = harness.publish(&ada, "Collage Club").await;
    let mut events = harness.bus().subscribe_queued(Topic::SAVED_ZINES_CHANGED);

    harness.service.save_zine(&bea, &zine.id).await.expect("first save");
    harness.service.save_zine(&bea, &zine.id).await.expect("second save");

    assert!(harness.service.is_zine_saved(&bea, &zine.id).await);
    let saved = harness.service.list_saved_zines(&bea).await;
    assert_eq!(saved.len(), 1);
    assert_eq!(events.drain(), 2);

    harness.service.unsave_zine(&bea, &zine.id).await.expect("unsave");

    assert!(!harness.service.is_zine_saved(&bea, &zine.id).await);
    assert!(harness.service.list_saved_zines(&bea).await.is_empty());
    assert_eq!(events.drain(), 1);
}

#[rstest]
#[tokio::test]
async fn saving_without_a_profile_is_not_found(harness: Harness) {
    let ghost = Session::authenticated(user("ghost"));
    let zine_id = ZineId::new("z1").expect("valid zine id");

    let err = harness
        .service
        .save_zine(&ghost, &zine_id)
        .await
        .expect_err("no profile to update");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn only_the_artist_may_delete_a_zine(harness: Harness) {
    let ada = harness.signed_in("ada").await;
    let bea = harness.signed_in("bea").await;
    let zine = harness.publish(&ada, "Keep Out").await;

    let err = harness
        .service
        .delete_zine(&bea, &zine.id)
        .await
        .expect_err("not the artist");

    assert_eq!(err.code(), ErrorCode::Unauthorized);
    let stored = harness.service.get_zine(&zine.id).await.expect("lookup");
    assert_eq!(stored, Some(zine));
}

#[rstest]
#[tokio::test]
async fn deleting_a_zine_clears_every_saved_reference(harness: Harness) {
    let ada = harness.signed_in("ada").await;
    let bea = harness.signed_in("bea").await;
    let cal = harness.signed_in("cal").await;
    let doomed = harness.publish(&ada, "Doomed").await;
    let kept = harness.publish(&ada, "Kept").await;
    for session in [&bea, &cal] {
        harness.service.save_zine(session, &doomed.id).await.expect("save");
    }
    harness.service.save_zine(&bea, &kept.id).await.expect("save");
    let mut events = harness.bus().subscribe_queued(Topic::SAVED_ZINES_CHANGED);

    let deletion = harness
        .service
        .delete_zine(&ada, &doomed.id)
        .await
        .expect("artist deletes");

    assert!(deletion.cleanup_complete);
    assert!(deletion.cover_removed);
    assert_eq!(deletion.saved_references_removed, 2);
    assert_eq!(events.try_recv(), Some(Topic::SAVED_ZINES_CHANGED));
    let remaining: Vec<ZineId> = harness
        .service
        .list_zines()
        .await
        .into_iter()
        .map(|zine| zine.id)
        .collect();
    assert_eq!(remaining, vec![kept.id.clone()]);
    assert!(!harness.service.is_zine_saved(&bea, &doomed.id).await);
    assert!(!harness.service.is_zine_saved(&cal, &doomed.id).await);
    assert!(harness.service.is_zine_saved(&bea, &kept.id).await);
    assert_eq!(
        harness.objects.paths(),
        vec![format!("zine-covers/{}.jpg", kept.id)]
    );
}

#[rstest]
#[tokio::test]
async fn every_flower_given_is_recorded(harness: Harness) {
    let ada = harness.signed_in("ada").await;
    let bea = harness.signed_in("bea").await;
    let zine = harness.publish(&ada, "Blooms").await;
    let asset = FlowerAsset::new(2).expect("valid asset");

    for _ in 0..3 {
        harness
            .service
            .give_flower(&bea, &zine.id, asset, "lovely")
            .await
            .expect("flower given");
    }

    let for_zine = harness.service.list_flowers_for_zine(&zine.id).await;
    assert_eq!(for_zine.len(), 3);
    assert!(for_zine.iter().all(|flower| flower.to_user_id == user("ada")));
    let received = harness
        .service
        .list_enriched_flowers_for_user(&user("ada"))
        .await;
    assert_eq!(received.len(), 3);
    assert!(received.iter().all(|enriched| {
        enriched.sender.as_ref().map(|sender| sender.display_name.as_str()) == Some("bea")
            && enriched.zine.as_ref().map(|target| &target.id) == Some(&zine.id)
    }));
}

#[rstest]
#[tokio::test]
async fn flowers_for_missing_zines_are_rejected(harness: Harness) {
    let bea = harness.signed_in("bea").await;
    let ghost = ZineId::new("ghost").expect("valid zine id");

    let err = harness
        .service
        .give_flower(&bea, &ghost, FlowerAsset::new(1).expect("valid asset"), "")
        .await
        .expect_err("target missing");

    assert_eq!(err.code(), ErrorCode::TargetNotFound);
    assert!(harness.documents.is_empty(Collection::Flowers));
}

#[rstest]
#[tokio::test]
async fn enrichment_reads_each_artist_once(harness: Harness) {
    let artists = ["a0", "a1", "a2"];
    for artist in artists {
        harness.documents.insert(
            Collection::Users,
            artist,
            fields(json!({ "displayName": artist.to_uppercase() })),
        );
    }
    for n in 0..100_u32 {
        let artist = artists.get((n % 3) as usize).copied().unwrap_or("a0");
        harness.insert_zine(&format!("z{n:03}"), artist, n % 28 + 1);
    }
    harness.documents.clear_operations();

    let enriched = harness.service.list_enriched_zines().await;

    assert_eq!(enriched.len(), 100);
    assert_eq!(harness.documents.count(OperationKind::Get), 3);
    assert_eq!(harness.documents.count(OperationKind::Query), 1);
    assert!(enriched.iter().all(|entry| {
        entry.artist.as_ref().map(|artist| &artist.id) == Some(&entry.zine.artist_id)
    }));
}

#[rstest]
#[case::single_sender_single_zine(1, 1, 5)]
#[case::few_senders_many_zines(3, 40, 80)]
#[tokio::test]
async fn flower_enrichment_reads_each_sender_and_zine_once(
    harness: Harness,
    #[case] senders: usize,
    #[case] zines: usize,
    #[case] flowers: usize,
) {
    for n in 0..senders {
        let sender = format!("s{n}");
        harness.documents.insert(
            Collection::Users,
            sender.clone(),
            fields(json!({ "displayName": sender })),
        );
    }
    for n in 0..zines {
        harness.insert_zine(&format!("z{n:02}"), "ada", 1);
    }
    for n in 0..flowers {
        harness.documents.insert(
            Collection::Flowers,
            format!("f{n:03}"),
            fields(json!({
                "fromUserId": format!("s{}", n % senders),
                "toZineId": format!("z{:02}", n % zines),
                "toUserId": "ada",
                "assetsType": 1,
                "createdAt": format!("2024-02-01T00:00:{:02}.{n:09}Z", n % 60),
            })),
        );
    }
    harness.documents.clear_operations();

    let enriched = harness
        .service
        .list_enriched_flowers_for_user(&user("ada"))
        .await;

    assert_eq!(enriched.len(), flowers);
    assert!(enriched.iter().all(|entry| entry.sender.is_some() && entry.zine.is_some()));
    assert_eq!(harness.documents.count(OperationKind::Get), senders);
    let in_queries = harness
        .documents
        .queries()
        .into_iter()
        .filter(|query| query.has_in_filter())
        .count();
    assert_eq!(in_queries, zines.div_ceil(30));
}

#[rstest]
#[tokio::test]
async fn zines_with_display_name_tags_stay_visible_and_deletable(harness: Harness) {
    let ada = harness.signed_in("ada").await;
    let bea = harness.signed_in("bea").await;
    harness.documents.insert(
        Collection::Zines,
        "z1",
        fields(json!({
            "title": "Legacy",
            "artistId": "ada",
            "createdAt": "2024-01-01T00:00:00.000000000Z",
            "tags": ["Comics", "Risograph"],
        })),
    );
    let zine_id = ZineId::new("z1").expect("valid zine id");

    let listed = harness.service.list_zines().await;
    assert_eq!(listed.len(), 1);
    let tags: Vec<&str> = listed
        .iter()
        .flat_map(|zine| zine.tags.iter().map(|tag| tag.as_str()))
        .collect();
    assert_eq!(tags, vec!["comics", "risograph"]);
    assert_eq!(harness.service.list_zines_by_artist(&user("ada")).await.len(), 1);

    harness
        .service
        .give_flower(&bea, &zine_id, FlowerAsset::new(3).expect("valid asset"), "")
        .await
        .expect("flower given");
    let deletion = harness
        .service
        .delete_zine(&ada, &zine_id)
        .await
        .expect("artist deletes");
    assert_eq!(deletion.zine_id, zine_id);
    assert!(harness.service.list_zines().await.is_empty());
}

#[rstest]
#[tokio::test]
async fn ownership_checks_only_need_the_artist(harness: Harness) {
    let ada = harness.signed_in("ada").await;
    harness.documents.insert(
        Collection::Zines,
        "z1",
        fields(json!({ "artistId": "ada", "pages": "lots" })),
    );
    let zine_id = ZineId::new("z1").expect("valid zine id");

    assert!(harness.service.list_zines().await.is_empty());
    harness
        .service
        .delete_zine(&ada, &zine_id)
        .await
        .expect("artist deletes");
    assert!(harness.documents.is_empty(Collection::Zines));
}

#[rstest]
#[tokio::test]
async fn empty_saved_set_issues_no_zine_query(harness: Harness) {
    let bea = harness.signed_in("bea").await;
    harness.documents.clear_operations();

    assert!(harness.service.list_saved_zines(&bea).await.is_empty());
    assert!(harness.documents.queries().is_empty());
}

#[rstest]
#[tokio::test]
async fn large_saved_sets_are_fetched_in_chunks(harness: Harness) {
    let ids: Vec<String> = (0..65).map(|n| format!("z{n:02}")).collect();
    for id in &ids {
        harness.insert_zine(id, "ada", 1);
    }
    harness.documents.insert(
        Collection::Users,
        "bea",
        fields(json!({ "displayName": "bea", "savedZines": ids })),
    );
    harness.documents.clear_operations();
    let bea = Session::authenticated(user("bea"));

    let saved = harness.service.list_saved_zines(&bea).await;

    assert_eq!(saved.len(), 65);
    let in_queries = harness
        .documents
        .queries()
        .into_iter()
        .filter(|query| query.has_in_filter())
        .count();
    assert_eq!(in_queries, 3);
}

#[rstest]
#[tokio::test]
async fn profiles_are_provisioned_once_and_merged(harness: Harness) {
    let session = Session::authenticated(user("dee"));
    let seed = ProfileSeed {
        display_name: Some("Dee".to_owned()),
        email: Some("dee@example.test".to_owned()),
    };

    let first = harness
        .service
        .ensure_own_profile(&session, seed.clone())
        .await
        .expect("created");
    let second = harness
        .service
        .ensure_own_profile(&session, seed)
        .await
        .expect("existing");
    assert!(first.was_created());
    assert!(!second.was_created());
    assert_eq!(first.profile().display_name, "Dee");

    let avatar = harness
        .service
        .upload_avatar(&session, vec![1, 2, 3])
        .await
        .expect("avatar uploaded");
    assert_eq!(avatar.as_str(), "https://objects.test/avatars/dee.jpg");
    let update = ProfileUpdate {
        avatar: Some(avatar.to_string()),
        about_me: Some("zinester".to_owned()),
        ..ProfileUpdate::default()
    };
    harness
        .service
        .update_own_profile(&session, &update)
        .await
        .expect("merged");

    let profile = harness
        .service
        .get_own_profile(&session)
        .await
        .expect("lookup")
        .expect("profile exists");
    assert_eq!(profile.display_name, "Dee");
    assert_eq!(profile.about_me, "zinester");
    assert_eq!(profile.avatar.as_deref(), Some(avatar.as_str()));
}

#[rstest]
#[tokio::test]
async fn own_profile_requires_a_principal(harness: Harness) {
    let err = harness
        .service
        .get_own_profile(&Session::anonymous())
        .await
        .expect_err("sign in required");

    assert_eq!(err.code(), ErrorCode::Unauthenticated);
}

#[rstest]
#[tokio::test]
async fn tag_catalogue_falls_back_to_builtin_tags(harness: Harness) {
    let fallback = harness.service.tag_catalogue().await;
    assert_eq!(fallback.source, TagSource::BuiltIn);
    assert!(!fallback.is_empty());

    harness.documents.insert(
        Collection::Tags,
        "zine-fest",
        fields(json!({ "displayName": "Zine Fest", "category": "theme" })),
    );
    let stored = harness.service.tag_catalogue().await;
    assert_eq!(stored.source, TagSource::Backend);
    assert_eq!(stored.len(), 1);
}

#[rstest]
#[tokio::test]
async fn sessions_follow_the_identity_provider() {
    let provider = StaticIdentityProvider::anonymous();
    assert!(!Session::resolve(&provider).await.is_authenticated());

    provider.sign_in(user("ada"));
    let session = Session::resolve(&provider).await;
    assert_eq!(session.principal_opt(), Some(&user("ada")));

    provider.sign_out();
    assert!(!Session::resolve(&provider).await.is_authenticated());
    assert!(session.is_authenticated());
}
