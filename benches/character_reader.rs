use criterion::{criterion_group, criterion_main, Criterion};
use quill_shared::character_reader::{CharacterReader, Config};

/// Generates a document with mixed ASCII and multi-byte content
fn sample_document() -> String {
    let mut html = String::from("<!DOCTYPE html><html><body>\n");
    for i in 0..2000 {
        html.push_str(&format!(
            "<p class=\"row-{i}\">Gr\u{00fc}\u{00df}e, \u{4e16}\u{754c} &amp; friends\r\n</p>\n"
        ));
    }
    html.push_str("</body></html>");
    html
}

fn read_all(reader: &mut CharacterReader) -> usize {
    let mut count = 0;
    while !reader.consume().is_eof() {
        count += 1;
    }
    count
}

fn character_reader(c: &mut Criterion) {
    let mut group = c.benchmark_group("Character reader");
    group.significance_level(0.1).sample_size(500);

    let html = sample_document();

    group.bench_function("default buffer", |b| {
        b.iter(|| {
            let mut reader = CharacterReader::new(&html);
            read_all(&mut reader)
        })
    });

    group.bench_function("small buffer with lines", |b| {
        b.iter(|| {
            let mut reader = CharacterReader::with_config(
                &html,
                Config {
                    buffer_size: 64,
                    track_lines: true,
                },
            );
            read_all(&mut reader)
        })
    });

    group.bench_function("from bytes", |b| {
        b.iter(|| {
            let mut reader = CharacterReader::from_bytes(html.as_bytes(), None, Config::default());
            read_all(&mut reader)
        })
    });

    group.finish();
}

criterion_group!(benches, character_reader);
criterion_main!(benches);
