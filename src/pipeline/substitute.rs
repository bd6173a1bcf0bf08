//! Placeholder substitution over the deck model.
//!
//! Editors split a token like `{{fullName}}` across runs at will (spell
//! check, partial formatting, autocorrect), so matching is done on the
//! concatenated text of a paragraph. A changed paragraph is collapsed into
//! its first run: the text keeps that run's formatting and the trailing runs
//! are emptied rather than removed.

use crate::deck::{Deck, DeckIndex, ShapeKind};
use crate::request::FieldValues;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use tracing::debug;

static LEFTOVER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[^{}]*\}\}").expect("static regex"));

/// A substituted copy of a deck.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub deck: Deck,
    /// Paragraphs whose text changed.
    pub paragraphs_changed: usize,
}

/// Apply every `(token, value)` of `fields` to `text`, in sorted token order,
/// replacing all literal occurrences.
///
/// Borrowed when nothing matched.
pub fn substitute_text<'a>(text: &'a str, fields: &FieldValues) -> Cow<'a, str> {
    let mut out = Cow::Borrowed(text);
    for (token, value) in fields.iter() {
        if out.contains(token) {
            out = Cow::Owned(out.replace(token, value));
        }
    }
    out
}

/// Substitute `fields` into every text-bearing shape of every slide.
///
/// Marker shapes are substituted too: they are removed later anyway, and a
/// template whose marker is missing keeps consistent text.
pub fn substitute(deck: &Deck, fields: &FieldValues) -> Substitution {
    let mut deck = deck.clone();
    let mut paragraphs_changed = 0;

    for slide in &mut deck.slides {
        let index = DeckIndex::classify(slide, None);
        for pos in index.text_bearing {
            let ShapeKind::Text(body) = &mut slide.shapes[pos].kind else {
                continue;
            };
            for paragraph in &mut body.paragraphs {
                if paragraph.runs.is_empty() {
                    continue;
                }
                let text = paragraph.text();
                if let Cow::Owned(new_text) = substitute_text(&text, fields) {
                    if new_text != text {
                        paragraph.collapse_into_first_run(new_text);
                        paragraphs_changed += 1;
                    }
                }
            }
        }
    }

    debug!("Substitution changed {} paragraphs", paragraphs_changed);
    log_leftover_tokens(&deck);

    Substitution {
        deck,
        paragraphs_changed,
    }
}

/// Delimited tokens still present after substitution, in slide order.
pub fn leftover_tokens(deck: &Deck) -> Vec<String> {
    let mut tokens = Vec::new();
    let bodies = deck
        .slides
        .iter()
        .flat_map(|slide| slide.shapes.iter())
        .filter_map(|shape| shape.text_body());
    for body in bodies {
        for paragraph in &body.paragraphs {
            let text = paragraph.text();
            tokens.extend(LEFTOVER_TOKEN.find_iter(&text).map(|m| m.as_str().to_string()));
        }
    }
    tokens
}

fn log_leftover_tokens(deck: &Deck) {
    let tokens = leftover_tokens(deck);
    if !tokens.is_empty() {
        debug!("Placeholders without a value: {}", tokens.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{Paragraph, Run, Shape, ShapeOrigin, Slide, TextBody};

    fn fields(pairs: &[(&str, &str)]) -> FieldValues {
        let mut f = FieldValues::new();
        for (k, v) in pairs {
            f.insert(*k, *v).unwrap();
        }
        f
    }

    fn deck_with_runs(runs: &[&str]) -> Deck {
        Deck {
            slides: vec![Slide {
                shapes: vec![Shape {
                    id: 2,
                    name: "Text 1".into(),
                    origin: ShapeOrigin::Template(0),
                    geometry: None,
                    placeholder: None,
                    kind: ShapeKind::Text(TextBody {
                        paragraphs: vec![Paragraph {
                            runs: runs.iter().map(|t| Run::new(*t)).collect(),
                        }],
                    }),
                }],
            }],
        }
    }

    fn runs(deck: &Deck) -> Vec<String> {
        deck.slides[0].shapes[0].text_body().unwrap().paragraphs[0]
            .runs
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }

    #[test]
    fn text_without_tokens_is_borrowed() {
        let f = fields(&[("{{fullName}}", "Alice")]);
        assert!(matches!(substitute_text("Certificate", &f), Cow::Borrowed("Certificate")));
    }

    #[test]
    fn replaces_every_occurrence() {
        let f = fields(&[("{{n}}", "x")]);
        assert_eq!(substitute_text("{{n}} and {{n}}", &f), "x and x");
    }

    #[test]
    fn tokens_apply_in_sorted_order() {
        // "{{a}}" sorts first and produces "{{b}}", which is then replaced.
        let f = fields(&[("{{b}}", "B"), ("{{a}}", "{{b}}")]);
        assert_eq!(substitute_text("{{a}}", &f), "B");
    }

    #[test]
    fn token_split_across_runs() {
        let deck = deck_with_runs(&["{{ful", "lName}}"]);
        let out = substitute(&deck, &fields(&[("{{fullName}}", "Alice Smith")]));
        assert_eq!(out.paragraphs_changed, 1);
        assert_eq!(runs(&out.deck), vec!["Alice Smith", ""]);
    }

    #[test]
    fn unused_tokens_change_nothing() {
        let deck = deck_with_runs(&["Awarded ", "to"]);
        let out = substitute(&deck, &fields(&[("{{fullName}}", "Alice Smith")]));
        assert_eq!(out.paragraphs_changed, 0);
        assert_eq!(out.deck, deck);
    }

    #[test]
    fn identity_replacement_keeps_runs() {
        let deck = deck_with_runs(&["{{x", "}}"]);
        let out = substitute(&deck, &fields(&[("{{x}}", "{{x}}")]));
        assert_eq!(out.paragraphs_changed, 0);
        assert_eq!(runs(&out.deck), vec!["{{x", "}}"]);
    }

    #[test]
    fn input_deck_is_untouched() {
        let deck = deck_with_runs(&["{{date}}"]);
        let _ = substitute(&deck, &fields(&[("{{date}}", "March 2025")]));
        assert_eq!(runs(&deck), vec!["{{date}}"]);
    }

    #[test]
    fn reports_leftovers() {
        let deck = deck_with_runs(&["{{status}} on {{date}}"]);
        let out = substitute(&deck, &fields(&[("{{date}}", "March 2025")]));
        assert_eq!(leftover_tokens(&out.deck), vec!["{{status}}"]);
    }

    #[test]
    fn marker_shapes_with_text_are_substituted() {
        let mut deck = deck_with_runs(&["{{qr_link}}"]);
        deck.slides[0].shapes[0].name = "qr".into();
        deck.slides[0].shapes.push(Shape {
            id: 3,
            name: "Logo".into(),
            origin: ShapeOrigin::Template(1),
            geometry: None,
            placeholder: None,
            kind: ShapeKind::Other,
        });
        let out = substitute(&deck, &fields(&[("{{qr_link}}", "https://example.com")]));
        assert_eq!(out.paragraphs_changed, 1);
        assert_eq!(runs(&out.deck), vec!["https://example.com"]);
        assert_eq!(out.deck.slides[0].shapes[1], deck.slides[0].shapes[1]);
    }
}
