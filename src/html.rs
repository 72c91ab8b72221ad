//! HTML documents parsed by html5ever (through `scraper`), with `<img>` lookup and
//! attribute rewriting.
//!
//! Scripting is treated as disabled, so the content of `<noscript>` is parsed as markup and
//! its images are found like any other.

use std::fmt;

use ego_tree::NodeId;
use html5ever::{
    LocalName, Namespace, ParseOpts, QualName, tendril::TendrilSink as _,
    tokenizer::TokenizerOpts, tree_builder::TreeBuilderOpts,
};
use scraper::{Html, HtmlTreeSink, Node, StrTendril};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Tokenizer states inside a start or end tag. html5ever drops a tag cut off by EOF.
const TAG_STATES: &[&str] = &[
    "TagName",
    "BeforeAttributeName",
    "AttributeName",
    "AfterAttributeName",
    "AttributeValue",
    "AfterAttributeValueQuoted",
    "SelfClosingStartTag",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("input ends inside a tag")]
    UnterminatedTag,
}

/// An `<img>` element, captured when it was looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageNode {
    index: usize,
    id: NodeId,
    attrs: Vec<(String, String)>,
}

impl ImageNode {
    /// Zero-based position among the document's image nodes.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Decoded attribute value. Names are matched ASCII case-insensitively.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// Starts with a doctype or `<html>`; serialized as a whole document.
    Document,
    /// Anything else is parsed in `<body>` context and serialized without a wrapper.
    Fragment,
}

#[derive(Debug)]
pub struct Document {
    html: Html,
    kind: Kind,
}

impl Document {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let opts = ParseOpts {
            tokenizer: TokenizerOpts {
                exact_errors: true,
                ..Default::default()
            },
            tree_builder: TreeBuilderOpts {
                scripting_enabled: false,
                ..Default::default()
            },
        };
        let kind = detect_kind(source);
        let html = match kind {
            Kind::Document => {
                html5ever::parse_document(HtmlTreeSink::new(Html::new_document()), opts)
                    .one(source)
            }
            Kind::Fragment => html5ever::parse_fragment(
                HtmlTreeSink::new(Html::new_fragment()),
                opts,
                QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from("body")),
                Vec::new(),
            )
            .one(source),
        };
        if html.errors.iter().any(|error| ends_inside_tag(error)) {
            return Err(ParseError::UnterminatedTag);
        }
        Ok(Self { html, kind })
    }

    /// Image nodes in document order.
    pub fn images(&self) -> Vec<ImageNode> {
        self.html
            .tree
            .root()
            .descendants()
            .filter_map(|node| {
                let element = node.value().as_element()?;
                (element.name() == "img").then(|| (node.id(), element))
            })
            .enumerate()
            .map(|(index, (id, element))| ImageNode {
                index,
                id,
                attrs: element
                    .attrs()
                    .map(|(name, value)| (name.to_owned(), value.to_owned()))
                    .collect(),
            })
            .collect()
    }

    /// Sets attribute `name` of `image` in place, appending it when absent.
    pub fn set_attr(&mut self, image: &ImageNode, name: &str, value: &str) {
        let Some(mut node) = self.html.tree.get_mut(image.id) else {
            return;
        };
        let Node::Element(element) = node.value() else {
            return;
        };
        let name = name.to_ascii_lowercase();
        let value = StrTendril::from_slice(value);
        match element
            .attrs
            .iter_mut()
            .find(|(key, _)| *key.local == *name)
        {
            Some((_, current)) => *current = value,
            None => {
                element.attrs.insert(
                    QualName::new(None, Namespace::from(""), LocalName::from(name)),
                    value,
                );
            }
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let html = match self.kind {
            Kind::Document => self.html.html(),
            // the fragment parser puts everything under a synthetic `<html>`
            Kind::Fragment => self.html.root_element().inner_html(),
        };
        f.write_str(&html)
    }
}

fn detect_kind(source: &str) -> Kind {
    let head = source.trim_start();
    let starts_with = |prefix: &str| {
        head.get(..prefix.len())
            .is_some_and(|start| start.eq_ignore_ascii_case(prefix))
    };
    if starts_with("<!doctype") || starts_with("<html") {
        Kind::Document
    } else {
        Kind::Fragment
    }
}

fn ends_inside_tag(error: &str) -> bool {
    error
        .strip_prefix("Saw EOF in state ")
        .is_some_and(|state| {
            let state = state.split_once('(').map_or(state, |(name, _)| name);
            TAG_STATES.contains(&state)
        })
}
