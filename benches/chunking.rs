use babylon_docs_mcp::embeddings::chunking::{ChunkingConfig, chunk_lines};
use criterion::{Criterion, criterion_group, criterion_main};
use std::fmt::Write;
use std::hint::black_box;

fn synthetic_source(classes: usize) -> String {
    let mut source = String::from("import { Vector3 } from \"../Maths/math.vector\";\n\n");
    for index in 0..classes {
        write!(
            source,
            "/**\n * Generated class {index}\n */\nexport class Generated{index} {{\n    public position = Vector3.Zero();\n\n    public update(delta: number): void {{\n        this.position.x += delta;\n    }}\n}}\n\n"
        )
        .expect("can write to string");
    }
    source
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let source = synthetic_source(400);
    let config = ChunkingConfig::default();
    c.bench_function("chunk_lines", |b| {
        b.iter(|| chunk_lines(black_box(&source), black_box(&config)));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
