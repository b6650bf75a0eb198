//! Segment trie.
//!
//! Every node is one path segment position. Children are keyed by their
//! literal text; params (`:name`) and catch-alls (`*name`) share one reserved
//! wildcard key, so a position has at most one wildcard child and a literal
//! always wins over it. Lookup cost is proportional to the path depth, not to
//! the number of routes.
//!
//! ```text
//! routes: /  /foo/:var/bar  /foo/bar  /bar/*path  /*path
//!
//!              (root) [GET]
//!       ┌────────┼──────────┐
//!     "foo"    "bar"       "*" *path [GET]
//!    ┌──┴──┐     │
//!  "bar"  "*"   "*" *path [GET]
//!  [GET]  :var
//!          │
//!        "bar" [GET]
//! ```
//!
//! Search never backtracks: once a literal child is taken, a wildcard sibling
//! is not tried for the same segment.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use crate::error::RouteError;
use crate::handler::BoxedHandler;
use crate::method::{Method, Slot};

/// Path parameters captured while matching, by name.
pub type Params = HashMap<String, String>;

const WILDCARD: &str = "*";
const PARAM: char = ':';
const CATCH_ALL: char = '*';

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum Kind {
    #[default]
    Literal,
    Param(String),
    CatchAll(String),
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal => f.write_str("literal"),
            Self::Param(name) => write!(f, "{PARAM}{name}"),
            Self::CatchAll(name) => write!(f, "{CATCH_ALL}{name}"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'p> {
    Literal(&'p str),
    Param(&'p str),
    CatchAll(&'p str),
}

impl Segment<'_> {
    fn key(&self) -> &str {
        match self {
            Self::Literal(text) => text,
            Self::Param(_) | Self::CatchAll(_) => WILDCARD,
        }
    }

    fn kind(&self) -> Kind {
        match self {
            Self::Literal(_) => Kind::Literal,
            Self::Param(name) => Kind::Param((*name).to_owned()),
            Self::CatchAll(name) => Kind::CatchAll((*name).to_owned()),
        }
    }
}

/// Splits a pattern into validated segments. `/` yields no segments.
fn parse(pattern: &str) -> Result<Vec<Segment<'_>>, RouteError> {
    let rest = pattern
        .strip_prefix('/')
        .ok_or(RouteError::MissingLeadingSlash)?;
    if rest.is_empty() {
        return Ok(Vec::new());
    }

    let last = rest.split('/').count() - 1;
    rest.split('/')
        .enumerate()
        .map(|(i, raw)| {
            let segment = parse_segment(raw)?;
            if matches!(segment, Segment::CatchAll(_)) && i != last {
                return Err(RouteError::CatchAllNotLast(raw.to_owned()));
            }
            Ok(segment)
        })
        .collect()
}

fn parse_segment(raw: &str) -> Result<Segment<'_>, RouteError> {
    let (segment, name) = if let Some(name) = raw.strip_prefix(PARAM) {
        (Segment::Param(name), name)
    } else if let Some(name) = raw.strip_prefix(CATCH_ALL) {
        (Segment::CatchAll(name), name)
    } else {
        (Segment::Literal(raw), raw)
    };

    if name.is_empty() || !name.bytes().all(is_segment_byte) {
        return Err(RouteError::InvalidSegment(raw.to_owned()));
    }
    Ok(segment)
}

fn is_segment_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.')
}

/// Parses a group or mount prefix; only literal segments are accepted.
pub(crate) fn parse_prefix(prefix: &str) -> Result<Vec<&str>, RouteError> {
    parse(prefix)?
        .into_iter()
        .map(|segment| match segment {
            Segment::Literal(text) => Ok(text),
            other => Err(RouteError::WildcardPrefix(other.kind().to_string())),
        })
        .collect()
}

/// Result of [`Node::search`].
pub(crate) struct Lookup<'t> {
    /// Handlers for the requested method, or the `ALL` handlers. May be empty.
    pub handlers: &'t [BoxedHandler],
    pub params: Params,
    /// A node was reached, whether or not it answers the method.
    pub matched: bool,
}

#[derive(Default)]
pub(crate) struct Node {
    kind: Kind,
    children: HashMap<String, Node>,
    handlers: HashMap<Slot, Vec<BoxedHandler>>,
}

impl Node {
    fn new(kind: Kind) -> Self {
        Self { kind, ..Self::default() }
    }

    /// Registers `handler` under every slot at the node `pattern` leads to,
    /// creating nodes along the way. Returns that node.
    pub(crate) fn insert(
        &mut self,
        pattern: &str,
        slots: &[Slot],
        handler: BoxedHandler,
    ) -> Result<&mut Node, RouteError> {
        if slots.is_empty() {
            return Err(RouteError::NoMethods);
        }
        let segments = parse(pattern)?;

        let mut node = self;
        for segment in &segments {
            node = node.child_mut(segment)?;
        }

        node.check_slots(slots)?;
        for slot in slots {
            node.handlers
                .entry(*slot)
                .or_default()
                .push(Arc::clone(&handler));
        }
        Ok(node)
    }

    fn child_mut(&mut self, segment: &Segment<'_>) -> Result<&mut Node, RouteError> {
        let kind = segment.kind();
        let child = self
            .children
            .entry(segment.key().to_owned())
            .or_insert_with(|| Node::new(kind.clone()));
        if child.kind != kind {
            return Err(RouteError::WildcardConflict {
                existing: child.kind.to_string(),
                new: kind.to_string(),
            });
        }
        Ok(child)
    }

    /// A route is either fully generic (`ALL`) or fully enumerated.
    fn check_slots(&self, slots: &[Slot]) -> Result<(), RouteError> {
        for (i, slot) in slots.iter().enumerate() {
            if slots[..i].contains(slot) || self.handlers.contains_key(slot) {
                return Err(RouteError::DuplicateMethod(slot.to_string()));
            }
            let mixed = match slot {
                Slot::Any => slots.len() > 1 || !self.handlers.is_empty(),
                Slot::Exact(_) => {
                    slots.contains(&Slot::Any) || self.handlers.contains_key(&Slot::Any)
                }
            };
            if mixed {
                return Err(RouteError::MixedAll);
            }
        }
        Ok(())
    }

    /// Puts `handler` in front of the chain stored under each slot.
    pub(crate) fn prepend(&mut self, slots: &[Slot], handler: &BoxedHandler) {
        for slot in slots {
            if let Some(chain) = self.handlers.get_mut(slot) {
                chain.insert(0, Arc::clone(handler));
            }
        }
    }

    /// Resolves `path` for `method`. `method` is `None` for methods outside
    /// [`Method`]; those only reach `ALL` handlers.
    pub(crate) fn search(&self, method: Option<Method>, path: &str) -> Lookup<'_> {
        let mut params = Params::new();
        let Some(node) = self.walk(path, &mut params) else {
            return Lookup { handlers: &[], params, matched: false };
        };

        let handlers = method
            .and_then(|m| node.handlers.get(&Slot::Exact(m)))
            .or_else(|| node.handlers.get(&Slot::Any))
            .map_or(&[][..], Vec::as_slice);
        Lookup { handlers, params, matched: true }
    }

    fn walk<'t>(&'t self, path: &str, params: &mut Params) -> Option<&'t Node> {
        if !path.starts_with('/') {
            return None;
        }
        let mut node = self;
        if path.len() == 1 {
            return Some(node);
        }

        // `pos` always sits on the `/` that opens the current segment.
        let mut pos = 0;
        while pos < path.len() {
            let start = pos + 1;
            let end = path[start..].find('/').map_or(path.len(), |i| start + i);
            let segment = &path[start..end];

            node = node.next(segment)?;
            match &node.kind {
                Kind::Literal => {}
                Kind::Param(name) => {
                    if segment.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), segment.to_owned());
                }
                Kind::CatchAll(name) => {
                    params.insert(name.clone(), path[pos..].to_owned());
                    return Some(node);
                }
            }
            pos = end;
        }
        Some(node)
    }

    fn next(&self, segment: &str) -> Option<&Node> {
        self.children
            .get(segment)
            .or_else(|| self.children.get(WILDCARD))
    }

    /// Unions `other` into `self`: handler maps are joined under the same
    /// rules as [`insert`](Self::insert) and children are merged recursively.
    /// Any collision is an error; nothing is overwritten.
    pub(crate) fn merge(&mut self, other: Node) -> Result<(), RouteError> {
        if self.kind != other.kind {
            return Err(RouteError::WildcardConflict {
                existing: self.kind.to_string(),
                new: other.kind.to_string(),
            });
        }

        for (slot, chain) in other.handlers {
            self.check_slots(&[slot])?;
            self.handlers.insert(slot, chain);
        }
        for (key, child) in other.children {
            match self.children.entry(key) {
                Entry::Occupied(entry) => entry.into_mut().merge(child)?,
                Entry::Vacant(entry) => {
                    entry.insert(child);
                }
            }
        }
        Ok(())
    }

    /// Follows (creating as needed) a chain of literal children.
    pub(crate) fn literal_path_mut(&mut self, segments: &[&str]) -> &mut Node {
        let mut node = self;
        for segment in segments {
            node = node.children.entry((*segment).to_owned()).or_default();
        }
        node
    }

    pub(crate) fn literal_path(&self, segments: &[&str]) -> Option<&Node> {
        segments
            .iter()
            .try_fold(self, |node, segment| node.children.get(*segment))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.handlers.is_empty() && self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::handler::{BoxFuture, boxed};

    fn noop(_: &mut Context) -> BoxFuture<'_> {
        Box::pin(async {})
    }

    fn same(a: &BoxedHandler, b: &BoxedHandler) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
    }

    const GET: &[Slot] = &[Slot::Exact(Method::Get)];
    const POST: &[Slot] = &[Slot::Exact(Method::Post)];
    const ALL: &[Slot] = &[Slot::Any];

    #[test]
    fn parse_segments() {
        assert_eq!(parse("/").unwrap(), vec![]);
        assert_eq!(
            parse("/foo/:id/*rest").unwrap(),
            vec![Segment::Literal("foo"), Segment::Param("id"), Segment::CatchAll("rest")]
        );
        assert_eq!(parse("foo"), Err(RouteError::MissingLeadingSlash));
        assert_eq!(parse("/foo/"), Err(RouteError::InvalidSegment(String::new())));
        assert_eq!(parse("/a//b"), Err(RouteError::InvalidSegment(String::new())));
        assert_eq!(parse("/:"), Err(RouteError::InvalidSegment(":".into())));
        assert_eq!(parse("/a:b"), Err(RouteError::InvalidSegment("a:b".into())));
        assert_eq!(parse("/sp ace"), Err(RouteError::InvalidSegment("sp ace".into())));
        assert_eq!(
            parse("/*path/more"),
            Err(RouteError::CatchAllNotLast("*path".into()))
        );
    }

    #[test]
    fn prefixes_are_literal() {
        assert_eq!(parse_prefix("/api/v1").unwrap(), vec!["api", "v1"]);
        assert!(parse_prefix("/").unwrap().is_empty());
        assert_eq!(
            parse_prefix("/users/:id"),
            Err(RouteError::WildcardPrefix(":id".into()))
        );
    }

    #[test]
    fn search_table() {
        let root_h = boxed(noop);
        let var_h = boxed(noop);
        let bar_h = boxed(noop);
        let catch_h = boxed(noop);
        let all_h = boxed(noop);

        let mut root = Node::default();
        root.insert("/", GET, Arc::clone(&root_h)).unwrap();
        root.insert("/foo/:var/bar", GET, Arc::clone(&var_h)).unwrap();
        root.insert("/foo/bar", GET, Arc::clone(&bar_h)).unwrap();
        root.insert("/bar/*path", GET, Arc::clone(&catch_h)).unwrap();
        root.insert("/*path", GET, Arc::clone(&catch_h)).unwrap();
        root.insert("/foo/bar/all", ALL, Arc::clone(&all_h)).unwrap();

        let get = Some(Method::Get);
        let post = Some(Method::Post);

        let hit = root.search(get, "/");
        assert!(hit.matched && same(&hit.handlers[0], &root_h));

        let hit = root.search(get, "/foo/test/bar");
        assert!(hit.matched && same(&hit.handlers[0], &var_h));
        assert_eq!(hit.params["var"], "test");

        let hit = root.search(get, "/foo/bar");
        assert!(hit.matched && same(&hit.handlers[0], &bar_h));
        assert!(hit.params.is_empty());

        let hit = root.search(get, "/bar/f/o/o");
        assert!(same(&hit.handlers[0], &catch_h));
        assert_eq!(hit.params["path"], "/f/o/o");

        let hit = root.search(get, "/f/o/bar.html");
        assert!(same(&hit.handlers[0], &catch_h));
        assert_eq!(hit.params["path"], "/f/o/bar.html");

        // Intermediate node: known route, nothing registered for GET.
        let hit = root.search(get, "/foo/test");
        assert!(hit.matched && hit.handlers.is_empty());
        assert_eq!(hit.params["var"], "test");

        // No backtracking into the root catch-all.
        assert!(!root.search(get, "/foo/test/foo").matched);
        assert!(!root.search(get, "/foo/bar/foo").matched);
        assert!(!root.search(post, "/foo/bar/foo").matched);

        let hit = root.search(post, "/foo/test/bar");
        assert!(hit.matched && hit.handlers.is_empty());

        for method in [get, post, Some(Method::Delete), None] {
            let hit = root.search(method, "/foo/bar/all");
            assert!(same(&hit.handlers[0], &all_h));
        }
    }

    #[test]
    fn search_edges() {
        let mut root = Node::default();
        root.insert("/users/:id", GET, boxed(noop)).unwrap();
        root.insert("/files/*rest", GET, boxed(noop)).unwrap();

        assert!(!root.search(Some(Method::Get), "users").matched);
        assert!(!root.search(Some(Method::Get), "/users/").matched);

        let hit = root.search(Some(Method::Get), "/files/");
        assert_eq!(hit.params["rest"], "/");

        // The catch-all needs at least the separator after its parent.
        let hit = root.search(Some(Method::Get), "/files");
        assert!(hit.matched && hit.handlers.is_empty());
    }

    #[test]
    fn duplicate_and_mixed_methods_fail() {
        let mut root = Node::default();
        root.insert("/a", GET, boxed(noop)).unwrap();
        assert_eq!(
            root.insert("/a", GET, boxed(noop)).err(),
            Some(RouteError::DuplicateMethod("GET".into()))
        );
        assert_eq!(root.insert("/a", ALL, boxed(noop)).err(), Some(RouteError::MixedAll));
        root.insert("/a", POST, boxed(noop)).unwrap();

        root.insert("/b", ALL, boxed(noop)).unwrap();
        assert_eq!(root.insert("/b", GET, boxed(noop)).err(), Some(RouteError::MixedAll));
        assert_eq!(
            root.insert("/b", ALL, boxed(noop)).err(),
            Some(RouteError::DuplicateMethod("ALL".into()))
        );

        assert_eq!(
            root.insert("/c", &[Slot::Any, Slot::Exact(Method::Get)], boxed(noop)).err(),
            Some(RouteError::MixedAll)
        );
        assert_eq!(root.insert("/c", &[], boxed(noop)).err(), Some(RouteError::NoMethods));
    }

    #[test]
    fn conflicting_wildcards_fail() {
        let mut root = Node::default();
        root.insert("/u/:id", GET, boxed(noop)).unwrap();
        root.insert("/u/:id/posts", GET, boxed(noop)).unwrap();
        assert_eq!(
            root.insert("/u/:name/x", GET, boxed(noop)).err(),
            Some(RouteError::WildcardConflict { existing: ":id".into(), new: ":name".into() })
        );
        assert_eq!(
            root.insert("/u/*rest", POST, boxed(noop)).err(),
            Some(RouteError::WildcardConflict { existing: ":id".into(), new: "*rest".into() })
        );
    }

    #[test]
    fn prepend_wraps_from_outside() {
        let endpoint = boxed(noop);
        let first = boxed(noop);
        let second = boxed(noop);

        let mut root = Node::default();
        let node = root.insert("/x", GET, Arc::clone(&endpoint)).unwrap();
        node.prepend(GET, &first);
        node.prepend(GET, &second);

        let chain = root.search(Some(Method::Get), "/x").handlers;
        assert_eq!(chain.len(), 3);
        assert!(same(&chain[0], &second));
        assert!(same(&chain[1], &first));
        assert!(same(&chain[2], &endpoint));
    }

    #[test]
    fn merging_empty_is_noop() {
        let h = boxed(noop);
        let mut root = Node::default();
        root.insert("/a/:id", GET, Arc::clone(&h)).unwrap();

        root.merge(Node::default()).unwrap();

        let hit = root.search(Some(Method::Get), "/a/1");
        assert_eq!(hit.handlers.len(), 1);
        assert!(same(&hit.handlers[0], &h));
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn merging_disjoint_trees_keeps_both() {
        let (a, b) = (boxed(noop), boxed(noop));

        let mut left = Node::default();
        left.insert("/shared/a", GET, Arc::clone(&a)).unwrap();
        let mut right = Node::default();
        right.insert("/shared/b", POST, Arc::clone(&b)).unwrap();
        right.insert("/shared/a", POST, Arc::clone(&b)).unwrap();

        left.merge(right).unwrap();

        assert!(same(&left.search(Some(Method::Get), "/shared/a").handlers[0], &a));
        assert!(same(&left.search(Some(Method::Post), "/shared/a").handlers[0], &b));
        assert!(same(&left.search(Some(Method::Post), "/shared/b").handlers[0], &b));
    }

    #[test]
    fn merging_collisions_fail() {
        let mut left = Node::default();
        left.insert("/a", GET, boxed(noop)).unwrap();
        let mut right = Node::default();
        right.insert("/a", GET, boxed(noop)).unwrap();
        assert_eq!(left.merge(right).err(), Some(RouteError::DuplicateMethod("GET".into())));

        let mut left = Node::default();
        left.insert("/a/:id", GET, boxed(noop)).unwrap();
        let mut right = Node::default();
        right.insert("/a/*rest", GET, boxed(noop)).unwrap();
        assert!(matches!(left.merge(right), Err(RouteError::WildcardConflict { .. })));
    }

    #[test]
    fn literal_paths() {
        let mut root = Node::default();
        assert!(root.literal_path(&["api", "v1"]).is_none());
        root.literal_path_mut(&["api", "v1"]);
        assert!(root.literal_path(&["api", "v1"]).is_some_and(Node::is_empty));
        assert!(!root.is_empty());
    }
}
