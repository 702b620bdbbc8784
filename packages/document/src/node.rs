//! Persisted document tree.
//!
//! A document is a tree of [`DocumentNode`]s. Frames are the only
//! containers; Text/Image/Shape are leaves; a [`PrefabInstance`] places a
//! template by reference and supplies no content tree of its own — its
//! content is the referenced template's, materialized during resolution.
//!
//! The union is closed on purpose: resolver, applier and differ all match
//! it exhaustively, so adding a node kind fails to compile everywhere the
//! kind must be handled.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::overrides::OverrideSet;

/// Template identifier, as issued by the persistence layer.
pub type TemplateId = String;

/// 2D vector used for placement and sizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const ONE: Vec2 = Vec2 { x: 1.0, y: 1.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Identity and placement shared by every node variant.
///
/// On a `PrefabInstance` these fields are intrinsic to the placement and
/// are never recorded as overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBase {
    /// Stable id, unique within the owning document's walk. Empty until
    /// the id assigner has run.
    #[serde(default)]
    pub local_id: String,
    pub name: String,
    #[serde(default = "Vec2::zero")]
    pub position: Vec2,
    #[serde(default = "Vec2::one")]
    pub scale: Vec2,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

impl Vec2 {
    fn zero() -> Vec2 {
        Vec2::ZERO
    }

    fn one() -> Vec2 {
        Vec2::ONE
    }
}

fn default_opacity() -> f64 {
    1.0
}

fn default_visible() -> bool {
    true
}

impl NodeBase {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            local_id: String::new(),
            name: name.into(),
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            opacity: 1.0,
            visible: true,
        }
    }
}

/// Behavior attached to a node (layout constraints, interactions, effects).
/// Property vocabulary is owned by the component registry, not the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub id: String,
    pub component_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl ComponentRecord {
    pub fn new(id: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component_type: component_type.into(),
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// Reference to a template, persisted on instance nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabRef {
    pub id: TemplateId,
    pub name: String,
}

/// Document tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DocumentNode {
    Frame(FrameNode),
    Text(TextNode),
    Image(ImageNode),
    Shape(ShapeNode),
    PrefabInstance(InstanceNode),
}

/// Container node. Child order is hierarchy-significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameNode {
    #[serde(flatten)]
    pub base: NodeBase,
    #[serde(default = "default_frame_size")]
    pub size: Vec2,
    #[serde(default)]
    pub clip: bool,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
    #[serde(default)]
    pub children: Vec<DocumentNode>,
}

fn default_frame_size() -> Vec2 {
    Vec2::new(100.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    #[serde(flatten)]
    pub base: NodeBase,
    pub content: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
}

fn default_font_size() -> f64 {
    14.0
}

fn default_color() -> String {
    "#000000".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageNode {
    #[serde(flatten)]
    pub base: NodeBase,
    pub source: String,
    #[serde(default)]
    pub fit: ImageFit,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    #[default]
    Fill,
    Contain,
    Cover,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeNode {
    #[serde(flatten)]
    pub base: NodeBase,
    #[serde(default)]
    pub shape: ShapeKind,
    #[serde(default = "default_fill")]
    pub fill: String,
    #[serde(default)]
    pub stroke: String,
    #[serde(default)]
    pub stroke_width: f64,
    #[serde(default)]
    pub corner_radius: f64,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
}

fn default_fill() -> String {
    "#cccccc".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Rect,
    Ellipse,
    Line,
}

/// Placement of a template in a document. Carries only the reference, the
/// override set and its own placement base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceNode {
    #[serde(flatten)]
    pub base: NodeBase,
    pub prefab_ref: PrefabRef,
    #[serde(default)]
    pub overrides: OverrideSet,
}

/// Placement keys live on the node base and are excluded from the override
/// system for instance roots.
pub const PLACEMENT_KEYS: &[&str] = &[
    "name", "position", "scale", "rotation", "opacity", "visible",
];

impl DocumentNode {
    pub fn base(&self) -> &NodeBase {
        match self {
            DocumentNode::Frame(n) => &n.base,
            DocumentNode::Text(n) => &n.base,
            DocumentNode::Image(n) => &n.base,
            DocumentNode::Shape(n) => &n.base,
            DocumentNode::PrefabInstance(n) => &n.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut NodeBase {
        match self {
            DocumentNode::Frame(n) => &mut n.base,
            DocumentNode::Text(n) => &mut n.base,
            DocumentNode::Image(n) => &mut n.base,
            DocumentNode::Shape(n) => &mut n.base,
            DocumentNode::PrefabInstance(n) => &mut n.base,
        }
    }

    pub fn local_id(&self) -> &str {
        &self.base().local_id
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            DocumentNode::Frame(_) => "Frame",
            DocumentNode::Text(_) => "Text",
            DocumentNode::Image(_) => "Image",
            DocumentNode::Shape(_) => "Shape",
            DocumentNode::PrefabInstance(_) => "PrefabInstance",
        }
    }

    pub fn children(&self) -> &[DocumentNode] {
        match self {
            DocumentNode::Frame(n) => &n.children,
            DocumentNode::Text(_)
            | DocumentNode::Image(_)
            | DocumentNode::Shape(_)
            | DocumentNode::PrefabInstance(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<DocumentNode>> {
        match self {
            DocumentNode::Frame(n) => Some(&mut n.children),
            DocumentNode::Text(_)
            | DocumentNode::Image(_)
            | DocumentNode::Shape(_)
            | DocumentNode::PrefabInstance(_) => None,
        }
    }

    pub fn components(&self) -> &[ComponentRecord] {
        match self {
            DocumentNode::Frame(n) => &n.components,
            DocumentNode::Text(n) => &n.components,
            DocumentNode::Image(n) => &n.components,
            DocumentNode::Shape(n) => &n.components,
            DocumentNode::PrefabInstance(_) => &[],
        }
    }

    pub fn components_mut(&mut self) -> Option<&mut Vec<ComponentRecord>> {
        match self {
            DocumentNode::Frame(n) => Some(&mut n.components),
            DocumentNode::Text(n) => Some(&mut n.components),
            DocumentNode::Image(n) => Some(&mut n.components),
            DocumentNode::Shape(n) => Some(&mut n.components),
            DocumentNode::PrefabInstance(_) => None,
        }
    }

    /// Object-level keys the override system may patch on this node kind.
    /// Instance nodes expose nothing: their own properties are placement.
    pub fn patchable_keys(&self) -> &'static [&'static str] {
        match self {
            DocumentNode::Frame(_) => &[
                "name", "position", "scale", "rotation", "opacity", "visible", "size", "clip",
            ],
            DocumentNode::Text(_) => &[
                "name", "position", "scale", "rotation", "opacity", "visible", "content",
                "font_size", "color", "align",
            ],
            DocumentNode::Image(_) => &[
                "name", "position", "scale", "rotation", "opacity", "visible", "source", "fit",
            ],
            DocumentNode::Shape(_) => &[
                "name", "position", "scale", "rotation", "opacity", "visible", "shape", "fill",
                "stroke", "stroke_width", "corner_radius",
            ],
            DocumentNode::PrefabInstance(_) => &[],
        }
    }

    // Builder constructors, mostly for fixtures and tooling.

    pub fn frame(name: impl Into<String>) -> Self {
        DocumentNode::Frame(FrameNode {
            base: NodeBase::named(name),
            size: default_frame_size(),
            clip: false,
            components: Vec::new(),
            children: Vec::new(),
        })
    }

    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        DocumentNode::Text(TextNode {
            base: NodeBase::named(name),
            content: content.into(),
            font_size: default_font_size(),
            color: default_color(),
            align: TextAlign::Left,
            components: Vec::new(),
        })
    }

    pub fn image(name: impl Into<String>, source: impl Into<String>) -> Self {
        DocumentNode::Image(ImageNode {
            base: NodeBase::named(name),
            source: source.into(),
            fit: ImageFit::Fill,
            components: Vec::new(),
        })
    }

    pub fn shape(name: impl Into<String>, shape: ShapeKind) -> Self {
        DocumentNode::Shape(ShapeNode {
            base: NodeBase::named(name),
            shape,
            fill: default_fill(),
            stroke: String::new(),
            stroke_width: 0.0,
            corner_radius: 0.0,
            components: Vec::new(),
        })
    }

    pub fn instance(
        name: impl Into<String>,
        template_id: impl Into<TemplateId>,
        template_name: impl Into<String>,
    ) -> Self {
        DocumentNode::PrefabInstance(InstanceNode {
            base: NodeBase::named(name),
            prefab_ref: PrefabRef {
                id: template_id.into(),
                name: template_name.into(),
            },
            overrides: OverrideSet::default(),
        })
    }

    pub fn with_local_id(mut self, local_id: impl Into<String>) -> Self {
        self.base_mut().local_id = local_id.into();
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.base_mut().position = Vec2::new(x, y);
        self
    }

    pub fn with_child(mut self, child: DocumentNode) -> Self {
        if let Some(children) = self.children_mut() {
            children.push(child);
        }
        self
    }

    pub fn with_component(mut self, component: ComponentRecord) -> Self {
        if let Some(components) = self.components_mut() {
            components.push(component);
        }
        self
    }

    pub fn with_overrides(mut self, overrides: OverrideSet) -> Self {
        if let DocumentNode::PrefabInstance(ref mut inst) = self {
            inst.overrides = overrides;
        }
        self
    }
}

/// A template document as owned by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: TemplateId,
    pub name: String,
    pub root: DocumentNode,
}

impl RawDocument {
    pub fn new(id: impl Into<TemplateId>, name: impl Into<String>, root: DocumentNode) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            root,
        }
    }
}
