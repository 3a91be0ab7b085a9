use mediavc_collection::{
    pull_collection, pull_registry, retrieve_collection, CollectionConfig, CommitOptions,
    ContentAddressable, LoadRange, Media, MediaCollection, MediaNode, MediaRegistry, PullOutcome,
};
use mediavc_relay::MemoryRelay;

fn node(id: &str) -> MediaNode {
    MediaNode::new(id, 1_700_000_000_000, "", Media::new(format!("{id}.bin"), "application/octet-stream", id.as_bytes().to_vec()))
}

#[tokio::test]
async fn remote_updates_are_detected_and_pulled() {
    let relay = MemoryRelay::new();

    // first party: three records, registered and pushed
    let ours = CollectionConfig::in_memory();
    let mut media = MediaCollection::create(&ours);
    for id in ["n0", "n1", "n2"] {
        media.add(node(id));
    }
    media.commit(&CommitOptions::default()).unwrap();
    let original_store_root = media.version_store_root().unwrap();
    let original_head = media.current_root().unwrap();
    media.push(&relay).await.unwrap();

    let mut registry = MediaRegistry::create(&ours);
    registry.add_collection("/media", media.clone());
    registry.commit(&CommitOptions::default()).unwrap();
    registry.push(&relay).await.unwrap();
    registry.load(LoadRange::all()).unwrap();

    assert!(!registry.are_remote_updates_for_loaded_collection("/media", &relay).await);

    // second party: pull the collection and the registry, extend, push
    let theirs = CollectionConfig::in_memory();
    let mut their_media: MediaCollection = pull_collection(&relay, media.version_store_id(), &theirs)
        .await
        .unwrap()
        .unwrap();
    let mut their_registry: MediaRegistry = pull_registry(&relay, registry.version_store_id(), &theirs)
        .await
        .unwrap()
        .unwrap();
    their_registry.load(LoadRange::all()).unwrap();
    assert_eq!(their_registry.get_by_name_loaded("/media").len(), 1);

    their_media.add(node("n3"));
    their_media.commit(&CommitOptions::default()).unwrap();
    their_media.push(&relay).await.unwrap();

    // first party reloads and sees the update
    registry.load(LoadRange::all()).unwrap();
    assert!(registry.are_remote_updates_for_loaded_collection("/media", &relay).await);

    assert_eq!(media.persisted_size().unwrap(), 3);
    assert_eq!(media.pull(&relay).await.unwrap(), PullOutcome::FastForward);
    assert_eq!(media.persisted_size().unwrap(), 4);
    assert_eq!(media.pull(&relay).await.unwrap(), PullOutcome::UpToDate);

    // history survives: the old head is still reachable from the old store root
    let mut reopened: MediaCollection = retrieve_collection(original_store_root, &ours).unwrap();
    reopened.checkout(original_head).unwrap();
    assert_eq!(reopened.load(LoadRange::all()).unwrap().len(), 3);
}

#[tokio::test]
async fn update_check_reads_the_served_head_not_the_latest_version() {
    let relay = MemoryRelay::new();
    let ours = CollectionConfig::in_memory();
    let mut media = MediaCollection::create(&ours);
    media.add(node("v1"));
    media.commit(&CommitOptions::default()).unwrap();
    let v1 = media.current_root().unwrap();
    media.push(&relay).await.unwrap();

    let mut registry = MediaRegistry::create(&ours);
    registry.add_collection("/media", media.clone());
    registry.commit(&CommitOptions::default()).unwrap();
    registry.load(LoadRange::all()).unwrap();

    // second party extends the lineage, then steps back and publishes v1 as head
    let theirs = CollectionConfig::in_memory();
    let mut remote: MediaCollection = pull_collection(&relay, media.version_store_id(), &theirs)
        .await
        .unwrap()
        .unwrap();
    remote.add(node("v2"));
    remote.commit(&CommitOptions::default()).unwrap();
    remote.checkout(v1).unwrap();
    remote.push(&relay).await.unwrap();

    let (_, served) = relay.served(media.version_store_id()).unwrap().unwrap();
    assert_eq!(served, v1);
    assert_eq!(media.persisted_size().unwrap(), 1);

    assert!(!registry.are_remote_updates_for_loaded_collection("/media", &relay).await);
    assert_eq!(media.pull(&relay).await.unwrap(), PullOutcome::UpToDate);
}

#[tokio::test]
async fn unknown_name_or_store_reports_no_updates() {
    let relay = MemoryRelay::new();
    let config = CollectionConfig::in_memory();
    let mut media = MediaCollection::create(&config);
    media.add(node("a"));
    media.commit(&CommitOptions::default()).unwrap();

    let mut registry = MediaRegistry::create(&config);
    registry.add_collection("/media", media);
    registry.commit(&CommitOptions::default()).unwrap();

    // nothing loaded yet
    assert!(!registry.are_remote_updates_for_loaded_collection("/media", &relay).await);

    // loaded, but never pushed
    registry.load(LoadRange::all()).unwrap();
    assert!(!registry.are_remote_updates_for_loaded_collection("/media", &relay).await);
    assert!(!registry.are_remote_updates_for_loaded_collection("/other", &relay).await);
}

#[tokio::test]
async fn divergent_pull_overwrites_local_head() {
    let relay = MemoryRelay::new();
    let ours = CollectionConfig::in_memory();
    let mut media = MediaCollection::create(&ours);
    media.add(node("base"));
    media.commit(&CommitOptions::default()).unwrap();
    media.push(&relay).await.unwrap();

    let theirs = CollectionConfig::in_memory();
    let mut remote: MediaCollection = pull_collection(&relay, media.version_store_id(), &theirs)
        .await
        .unwrap()
        .unwrap();
    remote.add(node("theirs"));
    remote.commit(&CommitOptions::default()).unwrap();
    remote.push(&relay).await.unwrap();

    media.add(node("ours"));
    media.commit(&CommitOptions::default()).unwrap();

    assert_eq!(media.pull(&relay).await.unwrap(), PullOutcome::Overwrote);
    assert_eq!(media.current_root(), remote.current_root());
    let ids: Vec<String> = media
        .load(LoadRange::all())
        .unwrap()
        .into_iter()
        .map(|n| n.id.clone())
        .collect();
    assert_eq!(ids, vec!["base", "theirs"]);
}

#[tokio::test]
async fn pull_of_unpublished_collection_is_not_found() {
    let relay = MemoryRelay::new();
    let mut media = MediaCollection::create(&CollectionConfig::in_memory());
    assert_eq!(media.pull(&relay).await.unwrap(), PullOutcome::NotFound);
    assert!(media.push(&relay).await.is_err());
}
