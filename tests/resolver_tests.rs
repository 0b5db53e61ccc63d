//! Resolution, cascade, and mime-binding behavior.

mod common;

use std::sync::Arc;

use berth::{
    AdapterRegistry, AdapterResolver, BackendKind, Capabilities, Error, MemorySettings,
    MisconfigurationPolicy,
};
use common::{CountingFactory, MisconfiguredFactory};

fn resolver_with(
    settings: MemorySettings,
    capabilities: Capabilities,
    factory: Arc<CountingFactory>,
) -> AdapterResolver {
    AdapterResolver::new(Arc::new(settings), AdapterRegistry::new())
        .with_capabilities(capabilities)
        .with_factory(factory)
}

#[test]
fn repeated_resolution_returns_the_cached_instance() {
    let factory = CountingFactory::new();
    let capabilities = Capabilities::builder().with(BackendKind::AwsS3).build();
    let resolver = resolver_with(MemorySettings::new(), capabilities, factory.clone());

    let first = resolver.resolve(BackendKind::AwsS3).unwrap();
    let second = resolver.resolve(BackendKind::AwsS3).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(factory.builds(), 1);
}

#[test]
fn capability_miss_cascades_to_local() {
    let factory = CountingFactory::new();
    let resolver = resolver_with(
        MemorySettings::new(),
        Capabilities::builder().build(),
        factory.clone(),
    );

    let adapter = resolver.resolve(BackendKind::AwsS3).unwrap();

    assert_eq!(adapter.kind(), BackendKind::Local);
    assert_eq!(factory.builds(), 1);
}

#[test]
fn cascade_stops_at_the_first_capable_candidate() {
    let factory = CountingFactory::new();
    let capabilities = Capabilities::builder().with(BackendKind::OvhSwift).build();
    let resolver = resolver_with(MemorySettings::new(), capabilities, factory.clone());

    // aliyun falls through aws-s3 (incapable) to ovh-svfs.
    let adapter = resolver.resolve(BackendKind::Aliyun).unwrap();

    assert_eq!(adapter.kind(), BackendKind::OvhSwift);
    assert_eq!(factory.builds(), 1);
}

#[test]
fn custom_chain_overrides_the_priority_order() {
    let factory = CountingFactory::new();
    let capabilities = Capabilities::builder()
        .with(BackendKind::Imgur)
        .with(BackendKind::AwsS3)
        .build();
    let resolver = resolver_with(MemorySettings::new(), capabilities, factory.clone())
        .with_chain(BackendKind::Aliyun, vec![BackendKind::Imgur]);

    let adapter = resolver.resolve(BackendKind::Aliyun).unwrap();

    assert_eq!(adapter.kind(), BackendKind::Imgur);
}

#[test]
fn misconfigured_candidate_degrades_by_default() {
    let capabilities = Capabilities::builder().with(BackendKind::AwsS3).build();
    let resolver = AdapterResolver::new(Arc::new(MemorySettings::new()), AdapterRegistry::new())
        .with_capabilities(capabilities)
        .with_factory(Arc::new(MisconfiguredFactory));

    let adapter = resolver.resolve(BackendKind::AwsS3).unwrap();

    assert_eq!(adapter.kind(), BackendKind::Local);
}

#[test]
fn misconfigured_candidate_fails_under_the_strict_policy() {
    let capabilities = Capabilities::builder().with(BackendKind::AwsS3).build();
    let resolver = AdapterResolver::new(Arc::new(MemorySettings::new()), AdapterRegistry::new())
        .with_capabilities(capabilities)
        .with_factory(Arc::new(MisconfiguredFactory))
        .with_policy(MisconfigurationPolicy::Fail);

    match resolver.resolve(BackendKind::AwsS3) {
        Err(Error::Configuration { backend, key }) => {
            assert_eq!(backend, BackendKind::AwsS3);
            assert_eq!(key, "apiKey");
        }
        other => panic!("expected Configuration error, got {other:?}"),
    }
}

#[test]
fn degraded_resolution_binds_both_identities() {
    let factory = CountingFactory::new();
    let resolver = resolver_with(
        MemorySettings::new(),
        Capabilities::builder().build(),
        factory.clone(),
    );

    let via_s3 = resolver.resolve(BackendKind::AwsS3).unwrap();
    let via_local = resolver.resolve(BackendKind::Local).unwrap();

    assert!(Arc::ptr_eq(&via_s3, &via_local));
    assert_eq!(factory.builds(), 1);
    assert!(resolver.registry().contains(BackendKind::AwsS3));
    assert!(resolver.registry().contains(BackendKind::Local));
}

#[test]
fn cascade_reuses_a_previously_bound_candidate() {
    let factory = CountingFactory::new();
    let resolver = resolver_with(
        MemorySettings::new(),
        Capabilities::builder().build(),
        factory.clone(),
    );

    let first = resolver.resolve(BackendKind::AwsS3).unwrap();
    // A different request cascading onto the same terminal candidate reuses
    // the bound adapter instead of rebuilding it.
    let second = resolver.resolve(BackendKind::Aliyun).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(factory.builds(), 1);
}

#[test]
fn local_resolves_whatever_the_capability_table_says() {
    let factory = CountingFactory::new();
    let resolver = resolver_with(
        MemorySettings::new(),
        Capabilities::builder().build(),
        factory.clone(),
    );

    let adapter = resolver.resolve(BackendKind::Local).unwrap();

    assert_eq!(adapter.kind(), BackendKind::Local);
}

#[test]
fn mime_types_sharing_an_identity_share_the_adapter() {
    let factory = CountingFactory::new();
    let settings = MemorySettings::new()
        .with("mimeTypes", "image/png|imgur\nimage/jpeg|imgur\n*|local");
    let capabilities = Capabilities::builder().with(BackendKind::Imgur).build();
    let resolver = resolver_with(settings, capabilities, factory.clone());

    let png = resolver.resolve_for_mime_type("image/png").unwrap();
    let jpeg = resolver.resolve_for_mime_type("image/jpeg").unwrap();
    let pdf = resolver.resolve_for_mime_type("application/pdf").unwrap();

    assert!(Arc::ptr_eq(&png, &jpeg));
    assert_eq!(png.kind(), BackendKind::Imgur);
    assert_eq!(pdf.kind(), BackendKind::Local);
    assert_eq!(factory.builds(), 2);
}

#[test]
fn unmatched_mime_type_uses_the_deployment_default() {
    let factory = CountingFactory::new();
    let settings = MemorySettings::new().with("uploadMethod", "aws-s3");
    let capabilities = Capabilities::builder().with(BackendKind::AwsS3).build();
    let resolver = resolver_with(settings, capabilities, factory.clone());

    let adapter = resolver.resolve_for_mime_type("video/mp4").unwrap();

    assert_eq!(adapter.kind(), BackendKind::AwsS3);
}

#[test]
fn wildcard_binding_covers_the_subtype_family() {
    let factory = CountingFactory::new();
    let settings = MemorySettings::new().with("mimeTypes", "image/*|imgur");
    let capabilities = Capabilities::builder().with(BackendKind::Imgur).build();
    let resolver = resolver_with(settings, capabilities, factory.clone());

    let adapter = resolver.resolve_for_mime_type("image/webp").unwrap();

    assert_eq!(adapter.kind(), BackendKind::Imgur);
}

// The scenarios below exercise the real factory end to end (construction
// only; no network I/O happens until an adapter operation is called).

#[cfg(feature = "aws-s3")]
#[test]
fn aws_s3_resolution_defaults_the_region() {
    let settings = MemorySettings::new()
        .with("uploadMethod", "aws-s3")
        .with("awsS3Key", "K")
        .with("awsS3Secret", "S")
        .with("awsS3Bucket", "b")
        .with("awsS3Region", "");
    let resolver = AdapterResolver::new(Arc::new(settings), AdapterRegistry::new());

    let adapter = resolver.resolve(BackendKind::AwsS3).unwrap();

    assert_eq!(adapter.kind(), BackendKind::AwsS3);
    assert!(format!("{adapter:?}").contains("us-east-1"));
}

#[cfg(feature = "aws-s3")]
#[test]
fn aws_s3_without_a_client_degrades_to_local() {
    let settings = MemorySettings::new()
        .with("uploadMethod", "aws-s3")
        .with("awsS3Key", "K")
        .with("awsS3Secret", "S")
        .with("awsS3Bucket", "b");
    let resolver = AdapterResolver::new(Arc::new(settings), AdapterRegistry::new())
        .with_capabilities(Capabilities::builder().build());

    let adapter = resolver.resolve(BackendKind::AwsS3).unwrap();

    assert_eq!(adapter.kind(), BackendKind::Local);
}

#[cfg(feature = "imgur")]
#[test]
fn imgur_mime_bindings_build_one_imgur_adapter() {
    let settings = MemorySettings::new()
        .with("imgurClientId", "abc123")
        .with("mimeTypes", "image/png|imgur\nimage/jpeg|imgur\n*|local");
    let resolver = AdapterResolver::new(Arc::new(settings), AdapterRegistry::new());

    let png = resolver.resolve_for_mime_type("image/png").unwrap();
    let jpeg = resolver.resolve_for_mime_type("image/jpeg").unwrap();
    let pdf = resolver.resolve_for_mime_type("application/pdf").unwrap();

    assert_eq!(png.kind(), BackendKind::Imgur);
    assert!(Arc::ptr_eq(&png, &jpeg));
    assert_eq!(pdf.kind(), BackendKind::Local);
}
