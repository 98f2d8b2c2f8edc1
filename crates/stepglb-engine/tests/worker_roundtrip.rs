//! The real engine driven through a worker.

use stepglb_engine::{ConversionError, StepToGlbLoader};
use stepglb_worker::{StartupFault, WorkerConfig, WorkerError, WorkerEvent, WorkerHandle};

const BOX: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/box.step"));
const PLATE: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../fixtures/plate_with_hole.step"
));

async fn next(worker: &mut WorkerHandle) -> WorkerEvent {
    worker.next_event().await.expect("worker exited early")
}

#[tokio::test]
async fn test_mixed_batch_keeps_order() {
    let mut worker = WorkerHandle::spawn(StepToGlbLoader::builtin(), &WorkerConfig::default()).unwrap();

    // Posted before readiness on purpose; the worker queues them.
    worker.post(BOX).await.unwrap();
    worker.post(&b"ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\nENDSEC;\nEND-ISO-10303-21;\n"[..])
        .await
        .unwrap();
    worker.post(PLATE).await.unwrap();

    let first = next(&mut worker).await;
    assert_eq!(first.sequence(), 0);
    let glb = first.into_result().unwrap();
    assert_eq!(&glb.as_bytes()[..4], b"glTF");

    match next(&mut worker).await {
        WorkerEvent::Fault(fault) => {
            assert_eq!(fault.sequence, 1);
            let cause = fault.source.downcast_ref::<ConversionError>().unwrap();
            assert!(matches!(cause, ConversionError::Step(_)));
        }
        other => panic!("expected a fault, got {other:?}"),
    }

    let third = next(&mut worker).await;
    assert_eq!(third.sequence(), 2);
    let plate = gltf::Gltf::from_slice(third.into_result().unwrap().as_bytes()).unwrap();
    assert_eq!(plate.meshes().count(), 1);

    let stats = worker.shutdown().await.unwrap();
    assert_eq!((stats.received, stats.replied, stats.faulted), (3, 2, 1));
}

#[tokio::test]
async fn test_hostile_input_faults_only_its_request() {
    let text = std::str::from_utf8(BOX).unwrap();
    let cyclic = text.replace(
        "#70 = LINE('', #1, #60);",
        "#70 = SURFACE_CURVE('', #70, (), .CURVE_3D.);",
    );
    let nested = format!("ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\n#1 = FOO({});", "(".repeat(200_000));

    let mut worker = WorkerHandle::spawn(StepToGlbLoader::builtin(), &WorkerConfig::default()).unwrap();
    worker.post(cyclic.into_bytes()).await.unwrap();
    worker.post(nested.into_bytes()).await.unwrap();
    worker.post(BOX).await.unwrap();

    for sequence in 0..2 {
        match next(&mut worker).await {
            WorkerEvent::Fault(fault) => {
                assert_eq!(fault.sequence, sequence);
                let cause = fault.source.downcast_ref::<ConversionError>().unwrap();
                assert!(matches!(cause, ConversionError::Step(_)));
            }
            other => panic!("expected a fault, got {other:?}"),
        }
    }
    let last = next(&mut worker).await;
    assert_eq!(last.sequence(), 2);
    assert!(last.into_result().is_ok());

    let stats = worker.shutdown().await.unwrap();
    assert_eq!((stats.received, stats.replied, stats.faulted), (3, 1, 2));
}

#[tokio::test]
async fn test_manifest_module_applies_settings() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("engine.toml");
    std::fs::write(&manifest, "format_version = 1\n[settings]\ntarget_extent = 10.0\n").unwrap();

    let mut worker = WorkerHandle::spawn(StepToGlbLoader::manifest(&manifest), &WorkerConfig::default()).unwrap();
    worker.ready().await.unwrap();
    worker.post(BOX).await.unwrap();

    let glb = next(&mut worker).await.into_result().unwrap();
    let doc = gltf::Gltf::from_slice(glb.as_bytes()).unwrap();
    let positions = doc
        .meshes()
        .next()
        .unwrap()
        .primitives()
        .next()
        .unwrap()
        .get(&gltf::mesh::Semantic::Positions)
        .unwrap();
    let min: Vec<f32> = serde_json::from_value(positions.min().unwrap()).unwrap();
    let max: Vec<f32> = serde_json::from_value(positions.max().unwrap()).unwrap();
    let extent = (0..3).map(|i| max[i] - min[i]).fold(0.0f32, f32::max);
    assert!((extent - 10.0).abs() < 1e-4);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_incompatible_manifest_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("engine.toml");
    std::fs::write(&manifest, "format_version = 9\n").unwrap();

    let mut worker = WorkerHandle::spawn(StepToGlbLoader::manifest(&manifest), &WorkerConfig::default()).unwrap();
    match worker.ready().await {
        Err(WorkerError::Startup(StartupFault::Incompatible(message))) => {
            assert!(message.contains("format_version 9"));
        }
        other => panic!("expected an incompatible module, got {other:?}"),
    }
}
