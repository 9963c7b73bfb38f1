use babylon_docs_mcp::search::extract_snippet;
use criterion::{Criterion, criterion_group, criterion_main};
use std::fmt::Write;
use std::hint::black_box;

fn synthetic_page(paragraphs: usize) -> String {
    let mut page = String::from("# Materials\n\n");
    for index in 0..paragraphs {
        write!(
            page,
            "Paragraph {index} explains how a standard material blends diffuse and specular colors under scene lighting.\n\n"
        )
        .expect("can write to string");
    }
    page.push_str("A PBR material uses metallic and roughness values for physically based shading.\n");
    page
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let page = synthetic_page(500);
    c.bench_function("extract_snippet", |b| {
        b.iter(|| extract_snippet(black_box(&page), black_box("pbr metallic roughness")));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
