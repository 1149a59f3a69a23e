use criterion::{Criterion, criterion_group, criterion_main};
use doc_chat::chunking::{ChunkingConfig, chunk_documents};
use doc_chat::documents::RawDocument;
use std::hint::black_box;

fn synthetic_document(paragraphs: usize) -> RawDocument {
    let mut text = String::new();
    for i in 0..paragraphs {
        text.push_str(&format!(
            "Paragraph {} covers shipping windows, return policies and support \
             escalation paths for the fictional Acme storefront. ",
            i
        ));
    }
    RawDocument {
        text,
        source_filename: "handbook.txt".to_string(),
    }
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let documents = vec![synthetic_document(2000)];
    let config = ChunkingConfig::default();
    c.bench_function("chunking", |b| {
        b.iter(|| chunk_documents(black_box(&documents), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
