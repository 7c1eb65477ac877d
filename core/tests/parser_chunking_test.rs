//! Chunking invariance of the section parser.
//!
//! Every fixture is fed at every possible pair of split points (on char
//! boundaries); the extracted sections and the single discovery must not
//! depend on where the stream was cut.

use dialecta_core::{SectionLayout, SectionStreamParser};

const TOKEN: &str = "## 💡 One-Liner";
const MARKER: &str = "## 📝 Full Argument";

fn layout() -> SectionLayout {
    SectionLayout::new(TOKEN, MARKER)
}

/// Feed `chunks`, returning (headline, full body, discoveries, call index of
/// the discovery).
fn run(chunks: &[&str]) -> (String, String, usize, Option<usize>) {
    let mut parser = SectionStreamParser::new(layout());
    let mut discoveries = 0;
    let mut found_at = None;
    for (i, chunk) in chunks.iter().enumerate() {
        if parser.feed(chunk).is_some() {
            discoveries += 1;
            found_at = Some(i);
        }
    }
    let sections = parser.into_sections();
    (sections.headline, sections.full_body, discoveries, found_at)
}

fn boundaries(text: &str) -> Vec<usize> {
    (0..=text.len()).filter(|i| text.is_char_boundary(*i)).collect()
}

fn assert_invariant(text: &str) {
    let (headline, body, discoveries, _) = run(&[text]);
    let cuts = boundaries(text);
    for (n, &a) in cuts.iter().enumerate() {
        for &b in &cuts[n..] {
            let chunks = [&text[..a], &text[a..b], &text[b..]];
            let (h, f, d, _) = run(&chunks);
            assert_eq!(h, headline, "headline differs at cuts {a},{b}");
            assert_eq!(f, body, "body differs at cuts {a},{b}");
            assert_eq!(d, discoveries, "discovery count differs at cuts {a},{b}");
        }
    }
}

#[test]
fn structured_output_is_chunking_invariant() {
    assert_invariant(&format!(
        "{TOKEN}\n投入产出比很高。\n\n{MARKER}\nFirst point.\nSecond point: ## not a marker.\n"
    ));
}

#[test]
fn unstructured_output_is_chunking_invariant() {
    assert_invariant("  Just prose, 没有标题, and a lone ## heading.\n");
}

#[test]
fn near_miss_marker_is_chunking_invariant() {
    assert_invariant(&format!("{TOKEN} x\n## 📝 Full Argumen\nstill headline region"));
}

#[test]
fn discovery_happens_exactly_once_when_marker_present() {
    let text = format!("{TOKEN}\nA\n{MARKER}\nB {MARKER} C");
    let (headline, body, discoveries, _) = run(&[&text]);
    assert_eq!(discoveries, 1);
    assert_eq!(headline, "A");
    assert_eq!(body, format!("B {MARKER} C"));
}

#[test]
fn scenario_found_on_second_call_only() {
    let chunks = [
        "## One-Liner\nShort claim.\n\n",
        "## Full Argument\nLong reasoning.",
    ];
    let mut parser = SectionStreamParser::new(SectionLayout::new("## One-Liner", "## Full Argument"));
    assert_eq!(parser.feed(chunks[0]), None);
    assert_eq!(parser.feed(chunks[1]), Some("Short claim."));
    let sections = parser.into_sections();
    assert_eq!(sections.headline, "Short claim.");
    assert_eq!(sections.full_body, "Long reasoning.");
}

#[test]
fn headline_never_contains_token() {
    let text = format!("{TOKEN} {TOKEN}\n  nested  \n{MARKER}\nbody");
    let cuts = boundaries(&text);
    for &a in &cuts {
        let (headline, _, _, _) = run(&[&text[..a], &text[a..]]);
        assert!(!headline.contains(TOKEN));
        assert_eq!(headline, "nested");
    }
}

#[test]
fn byte_at_a_time_stream() {
    let text = format!("{TOKEN}\nTiny.\n{MARKER}\nBody.");
    let cuts = boundaries(&text);
    let chunks: Vec<&str> = cuts.windows(2).map(|w| &text[w[0]..w[1]]).collect();
    let (headline, body, discoveries, found_at) = run(&chunks);
    assert_eq!(headline, "Tiny.");
    assert_eq!(body, "Body.");
    assert_eq!(discoveries, 1);
    // Discovery happens on the chunk that completes the marker.
    let marker_end = text.find(MARKER).unwrap() + MARKER.len();
    let completing = cuts.iter().position(|&c| c == marker_end).unwrap() - 1;
    assert_eq!(found_at, Some(completing));
}
