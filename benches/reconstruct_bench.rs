use criterion::{black_box, criterion_group, criterion_main, Criterion};
use requote::pipeline::TextPreparer;
use requote::{RegexSentenceTokenizer, SpeechReconstructor};

const DIALOG_PARAGRAPH: &str = "\"I wonder if I shall fall right through the earth!\" said Alice, \
\"how funny it'll seem to come out among the people that walk with their heads downward.\" \
The Antipathies, I think, she was rather glad there was no one listening, this time, as it \
didn't sound at all the right word. \"But I shall have to ask them what the name of the \
country is, you know. Please, Ma'am, is this New Zealand or Australia?\"";

const NARRATIVE_PARAGRAPH: &str = "Alice was beginning to get very tired of sitting by her \
sister on the bank, and of having nothing to do: once or twice she had peeped into the book \
her sister was reading, but it had no pictures or conversations in it.";

fn bench_reconstruct(c: &mut Criterion) {
    let reconstructor = SpeechReconstructor::new().unwrap();
    let tokenizer = RegexSentenceTokenizer::new().unwrap();

    c.bench_function("reconstruct_dialog_paragraph", |b| {
        b.iter(|| reconstructor.reconstruct(black_box(DIALOG_PARAGRAPH), &tokenizer))
    });

    c.bench_function("reconstruct_narrative_paragraph", |b| {
        b.iter(|| reconstructor.reconstruct(black_box(NARRATIVE_PARAGRAPH), &tokenizer))
    });
}

fn bench_full_preparation(c: &mut Criterion) {
    let preparer = TextPreparer::new().unwrap();
    let raw = "\u{201C}Oh dear! Oh dear!\u{201D} said the Rabbit\u{2014}\u{201C}I shall be late!\u{201D} [Illustration]";

    c.bench_function("prepare_paragraph", |b| {
        b.iter(|| preparer.prepare_paragraph(black_box(raw)))
    });
}

criterion_group!(benches, bench_reconstruct, bench_full_preparation);
criterion_main!(benches);
