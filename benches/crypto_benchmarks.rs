use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use e2ee_chat::{
    core::crypto::{unwrap_key, wrap_key},
    core::message::encode_frame,
    protocol::transport::read_frame,
    KeyMaterial, SessionKey, SymmetricAlgorithm,
};
use pqcrypto_kyber::kyber768;

fn benchmark_key_material(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_material");

    group.bench_function("generate_keypair", |b| {
        b.iter(|| black_box(KeyMaterial::generate()));
    });

    let (pk, sk) = kyber768::keypair();
    let key = [0x42u8; 32];

    group.bench_function("wrap_session_key", |b| {
        b.iter(|| black_box(wrap_key(&key, &pk).unwrap()));
    });

    let wrapped = wrap_key(&key, &pk).unwrap();
    group.bench_function("unwrap_session_key", |b| {
        b.iter(|| black_box(unwrap_key(&wrapped, &sk).unwrap()));
    });

    group.finish();
}

fn benchmark_message_cipher(c: &mut Criterion) {
    let session_key = SessionKey::from_bytes([7u8; 32]);

    for algorithm in [SymmetricAlgorithm::Aes256Gcm, SymmetricAlgorithm::ChaCha20Poly1305] {
        let mut group = c.benchmark_group(format!("message_{}", algorithm));
        let cipher = session_key.cipher(algorithm);

        for size in [64usize, 1024, 16 * 1024, 256 * 1024].iter() {
            let data = vec![0xABu8; *size];
            group.throughput(Throughput::Bytes(*size as u64));

            group.bench_with_input(BenchmarkId::new("encrypt", size), &data, |b, data| {
                b.iter(|| black_box(cipher.encrypt(data).unwrap()));
            });

            let sealed = cipher.encrypt(&data).unwrap();
            group.bench_with_input(BenchmarkId::new("decrypt", size), &sealed, |b, sealed| {
                b.iter(|| black_box(cipher.decrypt(sealed).unwrap()));
            });
        }

        group.finish();
    }
}

fn benchmark_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");

    for size in [64usize, 4096, 1024 * 1024].iter() {
        let payload = vec![0x11u8; *size];
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &payload, |b, payload| {
            b.iter(|| black_box(encode_frame(payload).unwrap()));
        });

        let frame = encode_frame(&payload).unwrap();
        group.bench_with_input(BenchmarkId::new("decode", size), &frame, |b, frame| {
            b.iter(|| {
                let mut reader: &[u8] = frame;
                black_box(read_frame(&mut reader, 2 * 1024 * 1024).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_key_material,
    benchmark_message_cipher,
    benchmark_framing
);
criterion_main!(benches);
