use criterion::{criterion_group, criterion_main, Criterion};
use quill_html5::errors::ParseErrorList;
use quill_html5::node::Namespace;
use quill_html5::tokenizer::{ParserData, Tokenizer};
use quill_shared::character_reader::CharacterReader;
use quill_testing::tree_construction::fixture::read_fixtures;
use std::cell::RefCell;
use std::rc::Rc;

fn tokenize(input: &str) -> usize {
    let mut stream = CharacterReader::new(input);
    let error_logger = Rc::new(RefCell::new(ParseErrorList::new(100)));
    let mut tokenizer = Tokenizer::new(&mut stream, None, error_logger);

    let mut count = 0;
    let parser_data = ParserData {
        adjusted_node_namespace: Namespace::Html,
    };
    while !tokenizer.next_token(parser_data).is_eof() {
        count += 1;
    }
    count
}

fn criterion_benchmark(c: &mut Criterion) {
    // Criterion can report inconsistent results from run to run in some cases.  We attempt to
    // minimize that in this setup.
    // https://stackoverflow.com/a/74136347/61048
    let mut group = c.benchmark_group("tokenization");
    group.significance_level(0.1).sample_size(500);

    // Fetch the files outside of the closure to avoid issues with file io
    let inputs = read_fixtures(None)
        .unwrap_or_default()
        .into_iter()
        .flat_map(|fixture| fixture.tests)
        .map(|test| test.spec.data)
        .collect::<Vec<_>>();

    group.bench_function("fixtures", |b| {
        b.iter(|| {
            for input in &inputs {
                tokenize(input);
            }
        })
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
