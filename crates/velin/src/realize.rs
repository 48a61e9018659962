//! Realization of content under styles.
//!
//! Realization rewrites a content tree by matching show-rule recipes against
//! its elements and applying their transformations. Recipes apply in reverse
//! declaration order, so later rules take precedence; a recipe's direct
//! replacement is fed back to the earlier recipes only, while child content
//! of the replacement is realized against the full rule set again. The
//! latter is where self-matching transforms recurse, bounded by the
//! recursion depth cap.

use crate::{
    bail,
    diag::{SourceResult, Trace, Tracepoint},
    engine::{Engine, MAX_SHOW_DEPTH},
    span::Span,
    types::{
        Args, Content, Elem, ElemKind, Label, Recipe, Selector, Str, Styles, Transformation,
    },
    value::Value,
};

/// Realizes content under the given styles.
///
/// Applies all recipes in the styles to the content tree and returns the
/// rewritten tree. Set rule entries are carried along unchanged inside styled
/// wrappers; consuming them is the layout engine's concern.
pub fn realize(engine: &mut Engine, content: &Content, styles: &Styles) -> SourceResult<Content> {
    let recipes: Vec<Recipe> = styles.recipes().cloned().collect();
    let mut realizer = Realizer { engine, seen: vec![] };
    realizer.content(content, &recipes, recipes.len(), 0)
}

/// The state of one realization pass.
struct Realizer<'a, 'w> {
    engine: &'a mut Engine<'w>,
    /// Summaries of the elements visited so far, in document order. Backs the
    /// before/after selector combinators.
    seen: Vec<ElemInfo>,
}

/// What the before/after combinators need to know about a visited element.
struct ElemInfo {
    name: Str,
    label: Option<Label>,
    text: Option<Str>,
}

/// A recipe's decision on an element.
enum Verdict {
    /// The recipe does not apply.
    Skip,
    /// The recipe applies to the element as a whole.
    Elem,
    /// The recipe applies to text ranges within a text element.
    Text(Vec<(std::ops::Range<usize>, Str)>),
}

impl<'w> Realizer<'_, 'w> {
    fn content(
        &mut self,
        content: &Content,
        recipes: &[Recipe],
        upto: usize,
        depth: usize,
    ) -> SourceResult<Content> {
        let mut out = vec![];
        for elem in content.elems() {
            out.extend(self.elem(elem, recipes, upto, depth)?);
        }
        Ok(Content::sequence(out))
    }

    fn elem(
        &mut self,
        elem: &Elem,
        recipes: &[Recipe],
        upto: usize,
        depth: usize,
    ) -> SourceResult<Vec<Elem>> {
        if depth > MAX_SHOW_DEPTH {
            bail!(elem.span, "maximum show rule recursion depth exceeded");
        }

        // Later recipes take precedence: scan from the end.
        for i in (0..upto).rev() {
            let recipe = recipes[i].clone();
            match self.verdict(&recipe, elem) {
                Verdict::Skip => {}
                Verdict::Elem => {
                    self.note(elem);
                    let matched = Value::Content(Content::elem(elem.clone()));
                    let replacement = self.apply(&recipe, elem, matched)?;
                    // Cascade the replacement through the earlier recipes.
                    let mut out = vec![];
                    for relem in replacement.elems() {
                        out.extend(self.elem(relem, recipes, i, depth + 1)?);
                    }
                    return Ok(out);
                }
                Verdict::Text(ranges) => {
                    self.note(elem);
                    return self.apply_text(elem, &recipe, &ranges, recipes, i, depth);
                }
            }
        }

        // No recipe applied: record the element and recurse into children.
        self.note(elem);

        if let ElemKind::Styled { styles, body } = &elem.kind {
            // A styled wrapper activates its own recipes for its subtree,
            // with precedence over the outer ones.
            let mut inner: Vec<Recipe> = recipes.to_vec();
            inner.extend(styles.recipes().cloned());
            let count = inner.len();
            let realized = self.content(body, &inner, count, depth)?;
            return Ok(vec![elem.with_body(realized)]);
        }

        if let Some(body) = elem.body() {
            let realized = self.content(body, recipes, recipes.len(), depth)?;
            return Ok(vec![elem.with_body(realized)]);
        }

        Ok(vec![elem.clone()])
    }

    /// Decides whether a recipe applies to an element.
    fn verdict(&self, recipe: &Recipe, elem: &Elem) -> Verdict {
        match &recipe.selector {
            None => Verdict::Elem,
            Some(selector) => self.matches(selector, elem),
        }
    }

    fn matches(&self, selector: &Selector, elem: &Elem) -> Verdict {
        match selector {
            Selector::Elem(name) => {
                if elem.name() == name.as_str() {
                    Verdict::Elem
                } else {
                    Verdict::Skip
                }
            }
            Selector::Label(label) => {
                if elem.label.as_ref() == Some(label) {
                    Verdict::Elem
                } else {
                    Verdict::Skip
                }
            }
            Selector::Text(pattern) => match &elem.kind {
                ElemKind::Text(text) if !pattern.is_empty() => {
                    let ranges: Vec<_> = text
                        .as_str()
                        .match_indices(pattern.as_str())
                        .map(|(start, matched)| {
                            (start..start + matched.len(), Str::from(matched))
                        })
                        .collect();
                    if ranges.is_empty() { Verdict::Skip } else { Verdict::Text(ranges) }
                }
                _ => Verdict::Skip,
            },
            Selector::Regex(regex) => match &elem.kind {
                ElemKind::Text(text) => {
                    let ranges: Vec<_> = regex
                        .find_iter(text.as_str())
                        .map(|found| (found.range(), Str::from(found.as_str())))
                        .collect();
                    if ranges.is_empty() { Verdict::Skip } else { Verdict::Text(ranges) }
                }
                _ => Verdict::Skip,
            },
            Selector::Or(selectors) => {
                for inner in selectors {
                    match self.matches(inner, elem) {
                        Verdict::Skip => {}
                        verdict => return verdict,
                    }
                }
                Verdict::Skip
            }
            Selector::And(selectors) => {
                let mut result = Verdict::Elem;
                for inner in selectors {
                    match self.matches(inner, elem) {
                        Verdict::Skip => return Verdict::Skip,
                        verdict => result = verdict,
                    }
                }
                result
            }
            Selector::Before { selector, end } => {
                if self.anchor_seen(end) {
                    Verdict::Skip
                } else {
                    self.matches(selector, elem)
                }
            }
            Selector::After { selector, start } => {
                if self.anchor_seen(start) {
                    self.matches(selector, elem)
                } else {
                    Verdict::Skip
                }
            }
        }
    }

    /// Whether an anchor selector has matched an element earlier in document
    /// order.
    fn anchor_seen(&self, anchor: &Selector) -> bool {
        self.seen.iter().any(|info| info_matches(anchor, info))
    }

    /// Records a visited element for the before/after combinators.
    fn note(&mut self, elem: &Elem) {
        let text = match &elem.kind {
            ElemKind::Text(text) => Some(text.clone()),
            _ => None,
        };
        self.seen.push(ElemInfo {
            name: elem.name().into(),
            label: elem.label.clone(),
            text,
        });
    }

    /// Applies a transformation to a whole element.
    fn apply(&mut self, recipe: &Recipe, elem: &Elem, matched: Value) -> SourceResult<Content> {
        Ok(match &recipe.transform {
            Transformation::None => Content::empty(),
            Transformation::Content(content) => content.clone(),
            Transformation::Styles(styles) => {
                Content::elem(elem.clone()).styled(styles.clone())
            }
            Transformation::Func(func) => {
                let args = Args::new(recipe.span, vec![matched]);
                let name = elem.name().to_owned();
                let point = || Tracepoint::Show(name);
                func.call(self.engine, args)
                    .trace(point, recipe.span)?
                    .display(recipe.span)
            }
        })
    }

    /// Applies a text recipe to the matched ranges of a text element.
    ///
    /// The element is split at the matched ranges; each matched range is
    /// replaced by the transformation's output, with the surrounding text
    /// kept as plain text elements. A full implementation would map ranges
    /// across element boundaries; this one matches within single text
    /// elements.
    fn apply_text(
        &mut self,
        elem: &Elem,
        recipe: &Recipe,
        ranges: &[(std::ops::Range<usize>, Str)],
        recipes: &[Recipe],
        upto: usize,
        depth: usize,
    ) -> SourceResult<Vec<Elem>> {
        let ElemKind::Text(text) = &elem.kind else {
            return Ok(vec![elem.clone()]);
        };

        let mut out = vec![];
        let mut cursor = 0;
        for (range, matched) in ranges {
            if range.start > cursor {
                out.extend(self.splice(
                    &text_elem(text.as_str(), cursor..range.start, elem.span),
                    recipes,
                    upto,
                    depth,
                )?);
            }
            let replacement = match &recipe.transform {
                Transformation::Styles(styles) => {
                    Content::elem(text_elem(text.as_str(), range.clone(), elem.span))
                        .styled(styles.clone())
                }
                _ => self.apply(recipe, elem, Value::Str(matched.clone()))?,
            };
            for relem in replacement.elems() {
                out.extend(self.elem(relem, recipes, upto, depth + 1)?);
            }
            cursor = range.end;
        }
        if cursor < text.len() {
            out.extend(self.splice(
                &text_elem(text.as_str(), cursor..text.len(), elem.span),
                recipes,
                upto,
                depth,
            )?);
        }

        Ok(out)
    }

    /// Realizes an unmatched text segment against the earlier recipes.
    fn splice(
        &mut self,
        elem: &Elem,
        recipes: &[Recipe],
        upto: usize,
        depth: usize,
    ) -> SourceResult<Vec<Elem>> {
        self.elem(elem, recipes, upto, depth)
    }
}

/// Matches an element summary against a selector, for anchor queries.
fn info_matches(selector: &Selector, info: &ElemInfo) -> bool {
    match selector {
        Selector::Elem(name) => info.name.as_str() == name.as_str(),
        Selector::Label(label) => info.label.as_ref() == Some(label),
        Selector::Text(pattern) => info
            .text
            .as_ref()
            .is_some_and(|text| text.contains(pattern.as_str())),
        Selector::Regex(regex) => {
            info.text.as_ref().is_some_and(|text| regex.is_match(text.as_str()))
        }
        Selector::Or(selectors) => selectors.iter().any(|inner| info_matches(inner, info)),
        Selector::And(selectors) => selectors.iter().all(|inner| info_matches(inner, info)),
        Selector::Before { selector, .. } | Selector::After { selector, .. } => {
            info_matches(selector, info)
        }
    }
}

/// Creates a text element covering a byte range of a larger text.
fn text_elem(text: &str, range: std::ops::Range<usize>, span: Span) -> Elem {
    Elem::new(ElemKind::Text(text[range].into()), span)
}

/// Collects all text from a content tree, descending into child-bearing
/// elements and ignoring structural breaks.
pub fn collect_text(content: &Content) -> String {
    content.plain_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_styles_leave_content_unchanged() {
        let world = crate::world::TestWorld::new(crate::ast::Markup::default());
        let mut engine = Engine::new(&world);
        let content = Content::text("hello", Span::detached());
        let realized = realize(&mut engine, &content, &Styles::new()).unwrap();
        assert_eq!(realized, content);
    }
}
