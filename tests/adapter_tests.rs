//! End-to-end adapter behavior against the in-memory and zstd backends

use qzcodec::native::{CountingLookup, MemoryBackend, MemoryDirect, ShimRegistry};
use qzcodec::{BufferRegion, CompressionAdapter, CompressionCodec, CompressionKind, Error};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;
use std::thread;

const BUFFER_SIZE: usize = 4096;

fn memory_adapter(backend: &MemoryBackend) -> CompressionAdapter {
    CompressionAdapter::new(
        BUFFER_SIZE,
        CompressionKind::Qat,
        Arc::new(backend.clone()),
        Arc::new(ShimRegistry::with_defaults()),
    )
}

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill_bytes(&mut data);
    data
}

/// Compressed bytes as the host would store them: primary then overflow.
fn joined(output: &BufferRegion, overflow: &BufferRegion) -> Vec<u8> {
    let mut bytes = output.written().to_vec();
    bytes.extend_from_slice(overflow.written());
    bytes
}

fn zeros_scenario(adapter: &CompressionAdapter) {
    let original = vec![0u8; 10_000];
    let mut input = BufferRegion::wrap(original.clone());
    let mut output = BufferRegion::allocate(256);
    let mut overflow = BufferRegion::allocate(20_000);

    let not_beneficial = adapter
        .compress(&mut input, &mut output, Some(&mut overflow))
        .expect("compress failed");
    assert!(!not_beneficial, "10,000 zero bytes must compress");

    let mut compressed = BufferRegion::wrap(joined(&output, &overflow));
    let mut restored = BufferRegion::allocate(original.len());
    adapter
        .decompress(&mut compressed, &mut restored)
        .expect("decompress failed");
    assert_eq!(restored.remaining_slice(), &original[..]);
    assert!(!compressed.has_remaining());
}

fn random_scenario(adapter: &CompressionAdapter) {
    let mut input = BufferRegion::wrap(random_bytes(10_000, 0x5eed));
    let mut output = BufferRegion::allocate(9_000);

    let not_beneficial = adapter
        .compress(&mut input, &mut output, None)
        .expect("compress failed");
    assert!(not_beneficial, "random bytes cannot beat their own size");
    assert_eq!(output.position(), 9_000);
    assert!(!output.has_remaining());
}

#[test]
fn test_zero_bytes_scenario_memory() {
    let backend = MemoryBackend::new();
    zeros_scenario(&memory_adapter(&backend));
    assert_eq!(backend.sessions_ended(), backend.sessions_created());
}

#[test]
fn test_random_bytes_scenario_memory() {
    let backend = MemoryBackend::new();
    random_scenario(&memory_adapter(&backend));
    assert_eq!(backend.sessions_ended(), 1);
}

#[cfg(feature = "zstd")]
#[test]
fn test_zero_bytes_scenario_zstd() {
    let cfg = qzcodec::CodecConfig {
        buffer_size: BUFFER_SIZE,
        ..Default::default()
    };
    zeros_scenario(&CompressionAdapter::with_zstd(&cfg).unwrap());
}

#[cfg(feature = "zstd")]
#[test]
fn test_random_bytes_scenario_zstd() {
    let cfg = qzcodec::CodecConfig {
        buffer_size: BUFFER_SIZE,
        ..Default::default()
    };
    random_scenario(&CompressionAdapter::with_zstd(&cfg).unwrap());
}

#[test]
fn test_overflow_holds_the_rest() {
    let backend = MemoryBackend::new();
    let adapter = CompressionAdapter::new(
        16,
        CompressionKind::Qat,
        Arc::new(backend.clone()),
        Arc::new(ShimRegistry::new()),
    );

    // 40 distinct runs of 50 bytes: 80 compressed bytes for 2000 input bytes.
    let original: Vec<u8> = (0..40u8)
        .flat_map(|b| std::iter::repeat(b + 1).take(50))
        .collect();
    let mut input = BufferRegion::wrap(original.clone());
    let mut output = BufferRegion::allocate(30);
    let mut overflow = BufferRegion::allocate(100);

    assert!(!adapter
        .compress(&mut input, &mut output, Some(&mut overflow))
        .unwrap());
    assert_eq!(output.position(), 30);
    assert_eq!(overflow.position(), 50);

    let mut compressed = BufferRegion::wrap(joined(&output, &overflow));
    let mut restored = BufferRegion::allocate(original.len());
    adapter.decompress(&mut compressed, &mut restored).unwrap();
    assert_eq!(restored.remaining_slice(), &original[..]);
}

#[test]
fn test_overflow_is_used_once() {
    let backend = MemoryBackend::new();
    let adapter = memory_adapter(&backend);
    let mut input = BufferRegion::wrap(random_bytes(1_000, 7));
    let mut output = BufferRegion::allocate(100);
    let mut overflow = BufferRegion::allocate(100);

    assert!(adapter
        .compress(&mut input, &mut output, Some(&mut overflow))
        .unwrap());
    assert!(!output.has_remaining());
    assert!(!overflow.has_remaining());
    assert_eq!(backend.sessions_ended(), 1);
}

#[test]
fn test_empty_input_is_trivially_compressed() {
    let backend = MemoryBackend::new();
    let adapter = memory_adapter(&backend);
    let mut input = BufferRegion::wrap(Vec::new());
    let mut output = BufferRegion::allocate(64);
    let mut overflow = BufferRegion::allocate(64);

    assert!(!adapter
        .compress(&mut input, &mut output, Some(&mut overflow))
        .unwrap());
    assert_eq!(output.position(), 0);
    assert_eq!(overflow.position(), 0);
}

#[test]
fn test_direct_path_used_exactly_once() {
    let direct = Arc::new(MemoryDirect::new());
    let registry = ShimRegistry::new();
    registry.register(CompressionKind::Qat, direct.clone());
    let backend = MemoryBackend::new();
    let adapter = CompressionAdapter::new(
        BUFFER_SIZE,
        CompressionKind::Qat,
        Arc::new(backend.clone()),
        Arc::new(registry),
    );

    let mut input = BufferRegion::wrap_direct(vec![5, b'q', 3, b'r']);
    let mut output = adapter.allocate_direct(16).unwrap();
    adapter.decompress(&mut input, &mut output).unwrap();

    assert_eq!(output.remaining_slice(), b"qqqqqrrr");
    assert!(!input.has_remaining());
    assert_eq!(direct.calls(), 1);
    assert_eq!(backend.decompressors_created(), 0);
}

#[test]
fn test_mixed_regions_take_managed_path() {
    let direct = Arc::new(MemoryDirect::new());
    let registry = ShimRegistry::new();
    registry.register(CompressionKind::Qat, direct.clone());
    let backend = MemoryBackend::new();
    let adapter = CompressionAdapter::new(
        BUFFER_SIZE,
        CompressionKind::Qat,
        Arc::new(backend.clone()),
        Arc::new(registry),
    );

    let mut input = BufferRegion::wrap_direct(vec![2, b'k']);
    let mut output = BufferRegion::allocate(16);
    adapter.decompress(&mut input, &mut output).unwrap();

    assert_eq!(output.remaining_slice(), b"kk");
    assert_eq!(direct.calls(), 0);
    assert_eq!(backend.decompressors_created(), 1);
}

#[test]
fn test_probe_once_across_threads() {
    let registry = ShimRegistry::new();
    registry.register(CompressionKind::Qat, Arc::new(MemoryDirect::new()));
    let lookup = Arc::new(CountingLookup::new(registry));
    let adapter = Arc::new(CompressionAdapter::new(
        BUFFER_SIZE,
        CompressionKind::Qat,
        Arc::new(MemoryBackend::new()),
        lookup.clone(),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let adapter = Arc::clone(&adapter);
            thread::spawn(move || (0..100).all(|_| adapter.is_available()))
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(lookup.probes(), 1);
}

#[test]
fn test_missing_hardware_library_is_not_an_error() {
    let lookup = Arc::new(CountingLookup::new(ShimRegistry::with_defaults()));
    let adapter = CompressionAdapter::new(
        BUFFER_SIZE,
        CompressionKind::Qat,
        Arc::new(MemoryBackend::new()),
        lookup.clone(),
    );
    assert!(!adapter.is_available());
    assert!(!adapter.is_available());
    assert_eq!(lookup.probes(), 1);
}

#[test]
fn test_sessions_released_on_every_path() {
    let backend = MemoryBackend::new();
    let adapter = memory_adapter(&backend);

    // success
    let mut input = BufferRegion::wrap(vec![1u8; 64]);
    let mut output = BufferRegion::allocate(64);
    adapter.compress(&mut input, &mut output, None).unwrap();

    // output exhausted without overflow
    let mut input = BufferRegion::wrap(random_bytes(64, 1));
    let mut output = BufferRegion::allocate(8);
    assert!(adapter.compress(&mut input, &mut output, None).unwrap());

    // injected compress fault
    backend.fail_compress(true);
    let mut input = BufferRegion::wrap(vec![1u8; 64]);
    let mut output = BufferRegion::allocate(64);
    assert!(matches!(
        adapter.compress(&mut input, &mut output, None),
        Err(Error::Native(_))
    ));
    backend.fail_compress(false);

    // injected decompress fault
    backend.fail_decompress(true);
    let mut input = BufferRegion::wrap(vec![4, b'a']);
    let mut output = BufferRegion::allocate(8);
    assert!(adapter.decompress(&mut input, &mut output).is_err());
    backend.fail_decompress(false);

    // dictionary required
    let mut input = BufferRegion::wrap(vec![0, 9]);
    let mut output = BufferRegion::allocate(8);
    assert!(matches!(
        adapter.decompress(&mut input, &mut output),
        Err(Error::DictionaryRequired)
    ));

    assert_eq!(backend.sessions_created(), 5);
    assert_eq!(backend.sessions_ended(), 5);
}

#[test]
fn test_codec_trait_view() {
    fn roundtrip<C: CompressionCodec>(codec: &C, data: &[u8]) -> Vec<u8> {
        let mut input = BufferRegion::wrap(data.to_vec());
        let mut output = BufferRegion::allocate(data.len());
        let not_beneficial = codec.compress(&mut input, &mut output, None).unwrap();
        assert!(!not_beneficial);

        let mut compressed = BufferRegion::wrap(output.written().to_vec());
        let mut restored = BufferRegion::allocate(data.len());
        codec.decompress(&mut compressed, &mut restored).unwrap();
        restored.remaining_slice().to_vec()
    }

    let backend = MemoryBackend::new();
    let adapter = memory_adapter(&backend).modify(&[qzcodec::Modifier::Binary]);
    let data = b"aaaaaaaaaabbbbbbbbbbcccccccccc";
    assert_eq!(roundtrip(&adapter, data), data.to_vec());
}

#[cfg(feature = "zstd")]
#[test]
fn test_zstd_direct_decompression() {
    let cfg = qzcodec::CodecConfig {
        kind: CompressionKind::Zstd,
        buffer_size: 1024,
        ..Default::default()
    };
    let adapter = CompressionAdapter::with_zstd(&cfg).unwrap();
    assert!(adapter.is_available());

    let original: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    let mut input = BufferRegion::wrap(original.clone());
    let mut output = BufferRegion::allocate(original.len());
    assert!(!adapter.compress(&mut input, &mut output, None).unwrap());

    let mut compressed = BufferRegion::wrap_direct(output.written().to_vec());
    let mut restored = adapter.allocate_direct(original.len()).unwrap();
    adapter.decompress(&mut compressed, &mut restored).unwrap();
    assert_eq!(restored.remaining_slice(), &original[..]);
    assert!(!compressed.has_remaining());
}

#[cfg(feature = "zstd")]
#[test]
fn test_zstd_truncated_stream() {
    let cfg = qzcodec::CodecConfig {
        buffer_size: 512,
        ..Default::default()
    };
    let adapter = CompressionAdapter::with_zstd(&cfg).unwrap();

    let original = random_bytes(4_000, 3)
        .into_iter()
        .map(|b| b % 4)
        .collect::<Vec<u8>>();
    let mut input = BufferRegion::wrap(original.clone());
    let mut output = BufferRegion::allocate(original.len());
    assert!(!adapter.compress(&mut input, &mut output, None).unwrap());

    let compressed = output.written();
    let mut truncated = BufferRegion::wrap(compressed[..compressed.len() / 2].to_vec());
    let mut restored = BufferRegion::allocate(original.len());
    let err = adapter
        .decompress(&mut truncated, &mut restored)
        .unwrap_err();
    assert!(matches!(err, Error::TruncatedInput { .. }), "got {err:?}");
}

#[cfg(feature = "zstd")]
#[test]
fn test_zstd_empty_frame_into_empty_output() {
    use qzcodec::native::libzstd::ZstdCompressor;
    use qzcodec::native::CompressorSession;

    // A complete frame whose content is empty.
    let mut session = ZstdCompressor::new(3, 64).unwrap();
    session.set_input(b"");
    session.finish();
    let mut frame = vec![0u8; 64];
    let mut len = 0;
    while !session.finished() {
        len += session.compress(&mut frame[len..]).unwrap();
    }
    session.end();
    frame.truncate(len);
    assert!(!frame.is_empty());

    let cfg = qzcodec::CodecConfig::default();
    let adapter = CompressionAdapter::with_zstd(&cfg).unwrap();
    let mut input = BufferRegion::wrap(frame);
    let mut output = BufferRegion::allocate(0);
    adapter.decompress(&mut input, &mut output).unwrap();
    assert_eq!(output.remaining(), 0);
    assert!(!input.has_remaining());
}

#[cfg(feature = "zstd")]
#[test]
fn test_zstd_nonempty_frame_into_empty_output() {
    let cfg = qzcodec::CodecConfig::default();
    let adapter = CompressionAdapter::with_zstd(&cfg).unwrap();

    let original = vec![5u8; 1_000];
    let mut input = BufferRegion::wrap(original);
    let mut output = BufferRegion::allocate(1_000);
    assert!(!adapter.compress(&mut input, &mut output, None).unwrap());

    let mut compressed = BufferRegion::wrap(output.written().to_vec());
    let mut restored = BufferRegion::allocate(0);
    let err = adapter
        .decompress(&mut compressed, &mut restored)
        .unwrap_err();
    assert!(matches!(err, Error::OutputExhausted { produced: 0 }), "got {err:?}");
}
