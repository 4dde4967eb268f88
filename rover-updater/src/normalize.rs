use crate::node::{Element, Rendered};
use crate::unit::UnitHandle;
use thiserror::Error;

/// Render output that has no child-node form
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{0} is not a valid child")]
pub struct UnsupportedChild(pub &'static str);

/// Turns render output into the ordered child elements handed to the diff.
pub trait Normalizer {
    fn to_child_list(
        &self,
        rendered: Rendered,
        owner: Option<UnitHandle>,
    ) -> Result<Vec<Element>, UnsupportedChild>;
}

/// Default normalizer.
///
/// Nested lists are flattened, `Nothing` and booleans leave no child, text
/// and numbers become text nodes. Elements without an owner are attributed
/// to `owner`.
#[derive(Debug, Default)]
pub struct ChildNormalizer;

impl ChildNormalizer {
    fn flatten(
        rendered: Rendered,
        owner: Option<UnitHandle>,
        out: &mut Vec<Element>,
    ) -> Result<(), UnsupportedChild> {
        match rendered {
            Rendered::Nothing | Rendered::Bool(_) => {}
            Rendered::Text(text) => out.push(Element::text(text)),
            Rendered::Number(number) => out.push(Element::text(number.to_string())),
            Rendered::Element(mut element) => {
                if element.owner.is_none() {
                    element.owner = owner;
                }
                out.push(element);
            }
            Rendered::List(items) => {
                for item in items {
                    Self::flatten(item, owner, out)?;
                }
            }
            Rendered::Object(_) => return Err(UnsupportedChild("an object")),
        }
        Ok(())
    }
}

impl Normalizer for ChildNormalizer {
    fn to_child_list(
        &self,
        rendered: Rendered,
        owner: Option<UnitHandle>,
    ) -> Result<Vec<Element>, UnsupportedChild> {
        let mut children = Vec::new();
        Self::flatten(rendered, owner, &mut children)?;
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use serde_json::json;

    fn text_of(element: &Element) -> &str {
        match &element.kind {
            NodeKind::Text(text) => text,
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_flattens_nested_lists() {
        let rendered = Rendered::List(vec![
            "a".into(),
            Rendered::Nothing,
            Rendered::List(vec![Rendered::Number(2.0), Rendered::Bool(false)]),
            Element::host("div").into(),
        ]);
        let children = ChildNormalizer.to_child_list(rendered, None).unwrap();

        assert_eq!(children.len(), 3);
        assert_eq!(text_of(&children[0]), "a");
        assert_eq!(text_of(&children[1]), "2");
        assert_eq!(children[2].kind.name(), "div");
    }

    #[test]
    fn test_sets_missing_owner() {
        let owner = UnitHandle::new(4, 1);
        let other = UnitHandle::new(9, 0);
        let mut owned = Element::host("span");
        owned.owner = Some(other);

        let children = ChildNormalizer
            .to_child_list(vec![Element::host("div"), owned].into(), Some(owner))
            .unwrap();
        assert_eq!(children[0].owner, Some(owner));
        assert_eq!(children[1].owner, Some(other));
    }

    #[test]
    fn test_rejects_objects() {
        let err = ChildNormalizer
            .to_child_list(json!([{ "a": 1 }]).into(), None)
            .unwrap_err();
        assert_eq!(err, UnsupportedChild("an object"));
    }
}
