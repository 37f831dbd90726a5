use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use tokio::sync::{mpsc, watch};

use pipeline_vcast::{
    Encoder, EncoderConfig, GStreamerEncoder, MediaSignal, PipelineBuilder, PipelineSignal,
};

/// EBML magic that opens every WebM stream
const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

fn plugins_available() -> bool {
    gstreamer::init().unwrap();
    let missing: Vec<_> = ["appsrc", "videoconvert", "vp8enc", "webmmux", "appsink"]
        .into_iter()
        .filter(|name| gstreamer::ElementFactory::find(name).is_none())
        .collect();
    if !missing.is_empty() {
        eprintln!("Skipping test: missing GStreamer elements {:?}", missing);
        return false;
    }
    true
}

#[test]
fn test_gstreamer_init() {
    assert!(gstreamer::init().is_ok());
}

#[test]
fn test_pipeline_parsing() {
    if !plugins_available() {
        return;
    }
    let launch = PipelineBuilder::build_pipeline_string(&EncoderConfig::default());
    let result = gstreamer::parse::launch(&launch);

    assert!(
        result.is_ok(),
        "Pipeline should parse successfully: {:?}",
        result.err()
    );
}

#[tokio::test]
async fn test_encoder_emits_webm_chunks_then_stops() {
    if !plugins_available() {
        return;
    }

    let (frames, rx) = watch::channel(Some(Arc::new(RgbaImage::from_pixel(
        64,
        36,
        Rgba([200, 40, 40, 255]),
    ))));
    let signal = MediaSignal::new(rx, 30, 64, 36).unwrap();
    let config = EncoderConfig::new(Duration::from_millis(200)).unwrap();
    let (tx, mut events) = mpsc::unbounded_channel();

    let mut encoder = GStreamerEncoder::new();
    encoder.start(signal.clone(), &config, "s1", tx.clone()).unwrap();
    assert!(encoder.is_running());
    assert!(matches!(
        encoder.start(signal, &config, "s1", tx),
        Err(pipeline_vcast::DomainError::EncoderAlreadyRunning)
    ));

    let first = match tokio::time::timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("first chunk in time")
        .expect("encoder alive")
    {
        PipelineSignal::Chunk(chunk) => chunk,
        other => panic!("expected a chunk, got {:?}", other),
    };
    assert_eq!(first.sequence(), 0);
    assert_eq!(&first.data()[..4], &EBML_MAGIC);

    encoder.stop();

    let mut last_sequence = first.sequence();
    let stopped = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = events.recv().await {
            match event {
                PipelineSignal::Chunk(chunk) => {
                    assert_eq!(chunk.sequence(), last_sequence + 1);
                    last_sequence = chunk.sequence();
                }
                PipelineSignal::EncoderStopped { session_id } => return session_id == "s1",
                other => panic!("unexpected signal {:?}", other),
            }
        }
        false
    })
    .await
    .expect("encoder drained in time");

    assert!(stopped);
    assert!(!encoder.is_running());
    drop(frames);
}
