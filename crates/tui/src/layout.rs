//! Turning a [`LayoutNode`] tree into live panes

use bus::EventBus;
use config::{Direction, LayoutError, LayoutNode};
use driver::Event;

use crate::panes::{PaneId, PaneKind, Panes};

/// Built layout: the tree shape with every leaf resolved to a pane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arrangement {
    Rows(Vec<Arrangement>),
    Columns(Vec<Arrangement>),
    Pane(PaneId),
}

impl Arrangement {
    /// Every pane in document order
    pub fn panes(&self) -> Vec<PaneId> {
        let mut out = Vec::new();
        self.collect_panes(&mut out);
        out
    }

    fn collect_panes(&self, out: &mut Vec<PaneId>) {
        match self {
            Arrangement::Rows(children) | Arrangement::Columns(children) => {
                for child in children {
                    child.collect_panes(out);
                }
            }
            Arrangement::Pane(id) => out.push(*id),
        }
    }
}

/// Creates the panes named by a layout and registers them for debugger events
pub struct LayoutBuilder<'a> {
    panes: &'a mut Panes,
    bus: &'a EventBus<Event, PaneId>,
}

impl<'a> LayoutBuilder<'a> {
    pub fn new(panes: &'a mut Panes, bus: &'a EventBus<Event, PaneId>) -> Self {
        Self { panes, bus }
    }

    pub fn build(&mut self, node: &LayoutNode) -> Result<Arrangement, LayoutError> {
        if let LayoutNode::Leaf(name) = node {
            return Err(LayoutError::TopLevelLeaf { name: name.clone() });
        }
        self.build_node(node)
    }

    fn build_node(&mut self, node: &LayoutNode) -> Result<Arrangement, LayoutError> {
        match node {
            LayoutNode::Rows(children) => {
                Ok(Arrangement::Rows(self.build_children(Direction::Rows, children)?))
            }
            LayoutNode::Columns(children) => Ok(Arrangement::Columns(
                self.build_children(Direction::Columns, children)?,
            )),
            LayoutNode::Leaf(name) => {
                let kind = PaneKind::from_name(name)
                    .ok_or_else(|| LayoutError::UnknownPane { name: name.clone() })?;
                let id = self.panes.insert(kind.create());
                self.bus.register(id);
                tracing::debug!(pane = %name, ?id, "created pane");
                Ok(Arrangement::Pane(id))
            }
        }
    }

    fn build_children(
        &mut self,
        direction: Direction,
        children: &[LayoutNode],
    ) -> Result<Vec<Arrangement>, LayoutError> {
        if children.is_empty() {
            return Err(LayoutError::EmptyChildren {
                key: direction.key(),
            });
        }
        children.iter().map(|child| self.build_node(child)).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::panes::Pane;

    fn build(node: &LayoutNode) -> (Result<Arrangement, LayoutError>, Panes, EventBus<Event, PaneId>) {
        let mut panes = Panes::default();
        let bus = EventBus::new();
        let result = LayoutBuilder::new(&mut panes, &bus).build(node);
        (result, panes, bus)
    }

    #[test]
    fn columns_of_two_panes() {
        let node = LayoutNode::from_value(&json!({"cols": ["source", "command"]})).unwrap();
        let (result, panes, bus) = build(&node);
        let arrangement = result.unwrap();

        let ids = arrangement.panes();
        assert_eq!(
            arrangement,
            Arrangement::Columns(vec![Arrangement::Pane(ids[0]), Arrangement::Pane(ids[1])])
        );
        assert_eq!(bus.listeners(), ids);
        assert_eq!(panes.len(), 2);
        assert!(matches!(panes.get(ids[0]), Some(Pane::Source(_))));
        assert!(matches!(panes.get(ids[1]), Some(Pane::Command(_))));
    }

    #[test]
    fn nested_panes_are_registered_in_document_order() {
        let node = LayoutNode::Rows(vec![
            LayoutNode::Columns(vec![
                LayoutNode::Leaf("source".to_string()),
                LayoutNode::Leaf("breakpoints".to_string()),
            ]),
            LayoutNode::Leaf("events".to_string()),
        ]);
        let (result, panes, bus) = build(&node);
        let arrangement = result.unwrap();

        let titles: Vec<&str> = arrangement
            .panes()
            .into_iter()
            .filter_map(|id| panes.get(id))
            .map(Pane::title)
            .collect();
        assert_eq!(titles, vec!["Source", "Breakpoints", "Debugger Events"]);
        assert_eq!(bus.listeners(), arrangement.panes());
    }

    #[test]
    fn empty_children_are_rejected() {
        let (result, _, _) = build(&LayoutNode::Columns(Vec::new()));
        assert!(matches!(result, Err(LayoutError::EmptyChildren { key: "cols" })));
    }

    #[test]
    fn unknown_panes_are_rejected() {
        let node = LayoutNode::from_value(&json!({"rows": ["source", "unknown_pane"]})).unwrap();
        let (result, _, _) = build(&node);
        match result {
            Err(LayoutError::UnknownPane { name }) => assert_eq!(name, "unknown_pane"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn a_bare_pane_is_not_a_layout() {
        let (result, panes, bus) = build(&LayoutNode::Leaf("source".to_string()));
        assert!(matches!(result, Err(LayoutError::TopLevelLeaf { .. })));
        assert_eq!(panes.len(), 0);
        assert!(bus.listeners().is_empty());
    }

    #[test]
    fn terminal_leaf_is_a_placeholder() {
        let node = LayoutNode::from_value(&json!({"rows": ["source", "terminal"]})).unwrap();
        let (result, panes, _) = build(&node);
        let ids = result.unwrap().panes();
        match panes.get(ids[1]) {
            Some(pane @ Pane::Placeholder(_)) => assert_eq!(pane.title(), "Terminal"),
            other => panic!("expected a placeholder, got {other:?}"),
        }
    }

    #[test]
    fn embedded_layouts_build() {
        let file = config::LayoutFile::embedded().unwrap();
        for name in file.names() {
            let node = file.get(name).unwrap();
            let (result, _, _) = build(node);
            assert!(result.is_ok(), "layout {name} failed: {result:?}");
        }
    }
}
