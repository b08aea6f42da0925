//! SVG rendering of a circuit.
//!
//! Everything is drawn in world units with y pointing up. The document wraps
//! the drawing in a single `scale(1,-1)` group so SVG's downward y axis never
//! leaks into the geometry code; text is flipped back locally so it reads
//! upright.
//!
//! Each component is drawn into its own picture on a [`Canvas`]. A picture is
//! replaced wholesale whenever its component changes, so stale strokes never
//! survive an edit.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, warn};
use svg::node::element::{Circle, Group, Line, Path as SvgPath, Polygon, Polyline, Text};
use svg::Document;

use crate::circuit::{Circuit, EditorError};
use crate::component::{Component, PlacedComponent};
use crate::family::Shape;
use crate::geometry::{Bounds, GeometryError, Position};
use crate::preferences::{DrawNodes, LabelCpts, LabelNodes, Preferences};
use crate::sketch::{Sketch, SketchError, SketchLibrary, POINTS_TO_CM};
use crate::tf::TF;

/// Space left around the drawing, in world units.
const MARGIN: f64 = 1.0;
const FONT_SIZE: f64 = 0.35;
const LABEL_COLOR: &str = "black";
const BODY_COLOR: &str = "black";

/// Handle of one drawn picture.
pub type PictureId = u64;

struct Picture {
    id: PictureId,
    group: Group,
}

/// Drawing surface holding one picture per component, in drawing order.
#[derive(Default)]
pub struct Canvas {
    pictures: BTreeMap<String, Picture>,
    order: Vec<String>,
    next_id: PictureId,
    released: usize,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `group` as the picture of `name`, undrawing any previous one.
    pub fn draw(&mut self, name: &str, group: Group) -> PictureId {
        self.undraw(name);
        self.next_id += 1;
        let id = self.next_id;
        self.pictures.insert(name.to_string(), Picture { id, group });
        self.order.push(name.to_string());
        id
    }

    /// Release the picture of `name`. Returns false when nothing was drawn.
    pub fn undraw(&mut self, name: &str) -> bool {
        if self.pictures.remove(name).is_none() {
            return false;
        }
        self.order.retain(|other| other != name);
        self.released += 1;
        true
    }

    pub fn picture(&self, name: &str) -> Option<PictureId> {
        self.pictures.get(name).map(|picture| picture.id)
    }

    pub fn len(&self) -> usize {
        self.pictures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pictures.is_empty()
    }

    /// Pictures released so far.
    pub fn released(&self) -> usize {
        self.released
    }

    fn groups(&self) -> impl Iterator<Item = &Group> {
        self.order
            .iter()
            .filter_map(|name| self.pictures.get(name))
            .map(|picture| &picture.group)
    }
}

/// Keeps a [`Canvas`] in step with a circuit.
#[derive(Default)]
pub struct Renderer {
    canvas: Canvas,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Redraw one component.
    pub fn redraw(
        &mut self,
        circuit: &Circuit,
        component: &Component,
        preferences: &Preferences,
        sketches: Option<&mut SketchLibrary>,
    ) -> Result<PictureId, EditorError> {
        let placed = circuit.placed(component)?;
        let group = draw_component(&placed, circuit, preferences, sketches)?;
        Ok(self.canvas.draw(&component.name, group))
    }

    /// Redraw every component and release pictures of deleted ones.
    pub fn sync(
        &mut self,
        circuit: &Circuit,
        preferences: &Preferences,
        mut sketches: Option<&mut SketchLibrary>,
    ) -> Result<(), EditorError> {
        let stale: Vec<String> = self
            .canvas
            .order
            .iter()
            .filter(|name| circuit.component(name).is_none())
            .cloned()
            .collect();
        for name in stale {
            debug!("Releasing picture of {name}");
            self.canvas.undraw(&name);
        }

        for component in circuit.components() {
            self.redraw(circuit, component, preferences, sketches.as_deref_mut())?;
        }
        Ok(())
    }

    /// The full document: component pictures, then node dots and labels.
    pub fn document(&self, circuit: &Circuit, preferences: &Preferences) -> Document {
        let bounds = circuit
            .bounding_box()
            .unwrap_or(Bounds {
                min: Position::default(),
                max: Position::default(),
            })
            .expand(MARGIN);

        let mut drawing = Group::new().set("transform", "scale(1,-1)");
        for group in self.canvas.groups() {
            drawing = drawing.add(group.clone());
        }
        drawing = drawing.add(draw_nodes(circuit, preferences));

        Document::new()
            .set("width", format!("{}cm", bounds.width()))
            .set("height", format!("{}cm", bounds.height()))
            .set(
                "viewBox",
                (bounds.min.x, -bounds.max.y, bounds.width(), bounds.height()),
            )
            .add(drawing)
    }
}

/// Render `circuit` as an SVG document. Sketch glyphs are used for component
/// bodies when a library is given and has them.
pub fn render(
    circuit: &Circuit,
    preferences: &Preferences,
    sketches: Option<&mut SketchLibrary>,
) -> Result<Document, EditorError> {
    let mut renderer = Renderer::new();
    renderer.sync(circuit, preferences, sketches)?;
    Ok(renderer.document(circuit, preferences))
}

pub fn save(document: &Document, output_path: &Path) -> Result<()> {
    svg::save(output_path, document)
        .with_context(|| format!("Failed to save SVG to {}", output_path.display()))?;
    Ok(())
}

/// SVG matrix `[a b c d e f]`, mapping `(x, y)` to
/// `(a x + c y + e, b x + d y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine([f64; 6]);

impl Affine {
    /// `self` applied after `first`.
    fn after(&self, first: &Affine) -> Affine {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = first.0;
        Affine([
            a * a2 + c * b2,
            b * a2 + d * b2,
            a * c2 + c * d2,
            b * c2 + d * d2,
            a * e2 + c * f2 + e,
            b * e2 + d * f2 + f,
        ])
    }

    fn to_svg(self) -> String {
        let [a, b, c, d, e, f] = self.0;
        format!("matrix({a} {b} {c} {d} {e} {f})")
    }
}

impl From<&TF> for Affine {
    fn from(tf: &TF) -> Self {
        Affine(tf.matrix())
    }
}

/// Maps sketch coordinates (points, y down) onto the local frame so the
/// glyph spans the width of the family's bounding polygon.
fn sketch_frame(sketch: &Sketch, local: &Bounds) -> Option<Affine> {
    if sketch.width <= 0.0 {
        return None;
    }
    let k = local.width() / sketch.width;
    let cx = (local.min.x + local.max.x) / 2.0;
    let cy = (local.min.y + local.max.y) / 2.0;
    Some(Affine([
        k,
        0.0,
        0.0,
        -k,
        cx - k * sketch.width / 2.0,
        cy + k * sketch.height / 2.0,
    ]))
}

fn points_attr(points: &[Position]) -> String {
    points.iter().map(|p| format!("{},{}", p.x, p.y)).join(" ")
}

fn stroke_width(preferences: &Preferences) -> f64 {
    preferences.line_width * POINTS_TO_CM
}

fn line(from: Position, to: Position, preferences: &Preferences) -> Line {
    Line::new()
        .set("x1", from.x)
        .set("y1", from.y)
        .set("x2", to.x)
        .set("y2", to.y)
        .set("stroke", BODY_COLOR)
        .set("stroke-width", stroke_width(preferences))
}

/// Upright text anchored at a world position.
fn label(text: &str, at: Position) -> Text {
    Text::new()
        .set("transform", format!("translate({},{}) scale(1,-1)", at.x, at.y))
        .set("font-size", FONT_SIZE)
        .set("text-anchor", "middle")
        .set("fill", LABEL_COLOR)
        .add(svg::node::Text::new(text))
}

/// Frame the body is drawn in. Stretchable symbols keep the size of a size 1
/// component and are joined to their nodes by leads.
fn body_tf(placed: &PlacedComponent, node_spacing: f64) -> Result<TF, EditorError> {
    let tf = placed.tf()?;
    if !placed.family.can_stretch || tf.scale_factor() <= node_spacing {
        return Ok(tf);
    }
    Ok(TF::new(tf.angle_deg(), node_spacing, tf.translation()))
}

fn draw_component(
    placed: &PlacedComponent,
    circuit: &Circuit,
    preferences: &Preferences,
    sketches: Option<&mut SketchLibrary>,
) -> Result<Group, EditorError> {
    let component = placed.component;
    let mut group = Group::new()
        .set("id", component.name.as_str())
        .set("fill", "none");
    if let Some(color) = &component.color {
        group = group.set("color", color.as_str());
    }

    match placed.family.shape {
        Shape::Wire => {
            let (from, to) = placed.anchors()?;
            group = group.add(line(from, to, preferences));
            if let Some(connection) = component.kind.connection() {
                group = group.add(label(connection.keyword(), to));
            }
        }
        Shape::DynamicWire => {
            let (from, to) = placed.anchors()?;
            let mut points = vec![from];
            points.extend(circuit.route(&component.name).unwrap_or_default());
            points.push(to);
            group = group.add(
                Polyline::new()
                    .set("points", points_attr(&points))
                    .set("stroke", BODY_COLOR)
                    .set("stroke-width", stroke_width(preferences)),
            );
        }
        _ if placed.tf() == Err(GeometryError::ZeroLengthWorld) => {
            warn!("{} has coincident nodes, not drawn", component.name);
        }
        _ => {
            let body = body_tf(placed, circuit.config().node_spacing)?;
            group = group.add(draw_body(placed, &body, preferences, sketches));
            group = draw_leads(group, placed, &body, preferences);
            if let Some(text) = component_label(component, preferences.label_cpts) {
                group = group.add(label(&text, placed.label_position()?));
            }
        }
    }

    Ok(group)
}

fn draw_body(
    placed: &PlacedComponent,
    body: &TF,
    preferences: &Preferences,
    sketches: Option<&mut SketchLibrary>,
) -> Group {
    let local = Bounds::from_points(placed.family.bbox_path.iter().copied());

    if let (Some(library), Some(local)) = (sketches, local) {
        match library.lookup_component(placed.component, placed.family) {
            Ok(sketch) => {
                if let Some(frame) = sketch_frame(sketch, &local) {
                    let transform = Affine::from(body).after(&frame);
                    let mut glyph = Group::new()
                        .set("transform", transform.to_svg())
                        .set("stroke", "currentColor");
                    for sketch_path in &sketch.paths {
                        let mut path = SvgPath::new().set("d", sketch_path.d.as_str());
                        if let Some(t) = &sketch_path.transform {
                            path = path.set("transform", t.as_str());
                        }
                        if let Some(style) = &sketch_path.style {
                            path = path.set("style", style.as_str());
                        }
                        glyph = glyph.add(path);
                    }
                    return glyph;
                }
            }
            Err(SketchError::NotFound { key, .. }) => {
                debug!("No sketch {key}, drawing outline of {}", placed.component.name)
            }
            Err(e) => warn!("Sketch for {} unavailable: {e}", placed.component.name),
        }
    }

    let outline = body.transform_all(placed.family.bbox_path);
    Group::new().add(
        Polygon::new()
            .set("points", points_attr(&outline))
            .set("stroke", "currentColor")
            .set("stroke-width", stroke_width(preferences)),
    )
}

/// Lines from where each pin sits on the body to its node.
fn draw_leads(
    mut group: Group,
    placed: &PlacedComponent,
    body: &TF,
    preferences: &Preferences,
) -> Group {
    let pins = placed.component.pins(placed.family);
    for (pinname, position) in placed.family.node_pinnames.iter().zip(&placed.positions) {
        let (Some(node), Some(local)) = (position, pins.position(pinname)) else {
            continue;
        };
        let on_body = body.transform(local);
        if on_body.distance(*node) > 1e-9 {
            group = group.add(line(on_body, *node, preferences));
        }
    }
    group
}

fn component_label(component: &Component, mode: LabelCpts) -> Option<String> {
    let name = component.label.as_deref().unwrap_or(&component.name);
    let value = component.value.as_deref().filter(|v| !v.is_empty());
    match (mode, value) {
        (LabelCpts::None, _) => None,
        (LabelCpts::Name, _) | (LabelCpts::Value | LabelCpts::ValueName, None) => {
            Some(name.to_string())
        }
        (LabelCpts::Value, Some(value)) => Some(value.to_string()),
        (LabelCpts::ValueName, Some(value)) => Some(format!("{name}={value}")),
    }
}

fn draw_nodes(circuit: &Circuit, preferences: &Preferences) -> Group {
    let mut group = Group::new().set("id", "nodes");

    for node in circuit.nodes() {
        let Some(position) = node.position else {
            continue;
        };
        let users = circuit.node_users(&node.name);

        let dot = match preferences.draw_nodes {
            DrawNodes::None => false,
            DrawNodes::Connections => users > 2,
            DrawNodes::Primary | DrawNodes::All => true,
        };
        if dot {
            group = group.add(
                Circle::new()
                    .set("cx", position.x)
                    .set("cy", position.y)
                    .set("r", preferences.node_size / 2.0)
                    .set("fill", preferences.node_color.as_str()),
            );
        }

        let labelled = match preferences.label_nodes {
            LabelNodes::None => false,
            LabelNodes::All | LabelNodes::Primary => true,
            LabelNodes::Alpha => node.name.starts_with(|c: char| c.is_alphabetic()),
            LabelNodes::Pins => users == 1,
        };
        if labelled {
            let offset = Position::new(preferences.node_size, preferences.node_size);
            group = group.add(label(&node.name, position + offset));
        }
    }

    group
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    use crate::circuit::CircuitConfig;
    use crate::kinds::SymbolStyle;
    use crate::registry::ComponentRegistry;

    const RESISTOR_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="40pt" height="10pt">
  <path d="M 0 5 L 10 0 L 20 10 L 30 0 L 40 5" />
</svg>
"#;

    fn divider(registry: &ComponentRegistry) -> Circuit<'_> {
        let mut circuit = Circuit::new(registry, CircuitConfig::default());
        circuit.create("R", "", 0.0, 0.0, 2.0, 0.0).unwrap();
        circuit.create("R", "", 2.0, 0.0, 4.0, 0.0).unwrap();
        circuit
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_canvas_undraws_before_redraw() {
        let mut canvas = Canvas::new();
        let first = canvas.draw("R1", Group::new());
        let second = canvas.draw("R1", Group::new());
        assert_ne!(first, second);
        assert_eq!(canvas.len(), 1);
        assert_eq!(canvas.released(), 1);
        assert_eq!(canvas.picture("R1"), Some(second));

        assert!(canvas.undraw("R1"));
        assert!(!canvas.undraw("R1"));
        assert!(canvas.is_empty());
    }

    #[test]
    fn test_sync_releases_deleted_components() {
        let registry = ComponentRegistry::new().unwrap();
        let mut circuit = divider(&registry);
        let prefs = Preferences::default();

        let mut renderer = Renderer::new();
        renderer.sync(&circuit, &prefs, None).unwrap();
        assert_eq!(renderer.canvas().len(), 2);

        circuit.delete("R2").unwrap();
        renderer.sync(&circuit, &prefs, None).unwrap();
        assert_eq!(renderer.canvas().len(), 1);
        assert!(renderer.canvas().picture("R2").is_none());
    }

    #[test]
    fn test_outline_without_sketches() {
        let registry = ComponentRegistry::new().unwrap();
        let circuit = divider(&registry);
        let text = render(&circuit, &Preferences::default(), None)
            .unwrap()
            .to_string();

        assert_eq!(count(&text, "<polygon"), 2);
        assert!(text.contains(r#"id="R1""#));
        assert_eq!(count(&text, "<text"), 2);
        // Node 2 joins only two components.
        assert_eq!(count(&text, "<circle"), 0);
    }

    #[test]
    fn test_draw_all_nodes() {
        let registry = ComponentRegistry::new().unwrap();
        let circuit = divider(&registry);
        let prefs = Preferences {
            draw_nodes: DrawNodes::All,
            label_nodes: LabelNodes::All,
            label_cpts: LabelCpts::None,
            ..Default::default()
        };
        let text = render(&circuit, &prefs, None).unwrap().to_string();
        assert_eq!(count(&text, "<circle"), 3);
        // Node labels only.
        assert_eq!(count(&text, "<text"), 3);
    }

    #[test]
    fn test_sketch_glyph_replaces_outline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("american").join("R.svg");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, RESISTOR_SVG).unwrap();

        let registry = ComponentRegistry::new().unwrap();
        let circuit = divider(&registry);
        let mut library = SketchLibrary::new(dir.path(), SymbolStyle::American);
        let text = render(&circuit, &Preferences::default(), Some(&mut library))
            .unwrap()
            .to_string();

        assert_eq!(count(&text, "M 0 5 L 10 0"), 2);
        assert_eq!(count(&text, "<polygon"), 0);
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_collapsed_component_is_skipped() {
        let registry = ComponentRegistry::new().unwrap();
        let text = "; nodes={1@(0, 0), 2@(2, 0), 3@(2, 0)}\nR1 1 2; right\nR2 2 3; right\n";
        let circuit = Circuit::from_schematic(text, &registry, CircuitConfig::default()).unwrap();

        let mut renderer = Renderer::new();
        renderer.sync(&circuit, &Preferences::default(), None).unwrap();
        assert_eq!(renderer.canvas().len(), 2);

        let text = renderer.document(&circuit, &Preferences::default()).to_string();
        assert_eq!(count(&text, "<polygon"), 1);
        assert!(text.contains(r#"id="R2""#));
    }

    #[test]
    fn test_long_component_gets_leads() {
        let registry = ComponentRegistry::new().unwrap();
        let mut circuit = Circuit::new(&registry, CircuitConfig::default());
        circuit.create("R", "", 0.0, 0.0, 6.0, 0.0).unwrap();

        let text = render(&circuit, &Preferences::default(), None)
            .unwrap()
            .to_string();
        assert_eq!(count(&text, "<line"), 2);
    }

    #[test]
    fn test_dynamic_wire_polyline() {
        let registry = ComponentRegistry::new().unwrap();
        let mut circuit = Circuit::new(&registry, CircuitConfig::default());
        circuit.create("R", "", 3.0, 1.0, 3.0, 3.0).unwrap();
        let wire = circuit.create("DW", "", 1.0, 1.0, 5.0, 1.0).unwrap();
        let corners = circuit.route(&wire).unwrap().len();

        let text = render(&circuit, &Preferences::default(), None)
            .unwrap()
            .to_string();
        let polyline = text
            .lines()
            .find(|line| line.contains("<polyline"))
            .unwrap();
        let points = polyline.split("points=\"").nth(1).unwrap();
        let points = points.split('"').next().unwrap();
        assert_eq!(points.split(' ').count(), corners + 2);
        assert!(points.starts_with("1,1 "));
        assert!(points.ends_with(" 5,1"));
    }

    #[test]
    fn test_affine_composition() {
        let tf = TF::new(90.0, 2.0, Position::new(1.0, 0.0));
        let frame = Affine([1.0, 0.0, 0.0, -1.0, 0.0, 0.0]);
        let [a, b, c, d, e, f] = Affine::from(&tf).after(&frame).0;
        // (1, 0) -> (1, 0) -> (0, 2) -> (1, 2)
        assert!((a + e - 1.0).abs() < 1e-9);
        assert!((b + f - 2.0).abs() < 1e-9);
        // (0, 1) -> (0, -1) -> (2, 0) -> (3, 0)
        assert!((c + e - 3.0).abs() < 1e-9);
        assert!((d + f).abs() < 1e-9);
    }

    #[test]
    fn test_component_label() {
        let registry = ComponentRegistry::new().unwrap();
        let family = registry.get("R").unwrap();
        let mut cpt = Component::new("R1", family, family.default_kind());
        assert_eq!(component_label(&cpt, LabelCpts::Value).as_deref(), Some("R1"));
        cpt.value = Some("10k".to_string());
        assert_eq!(component_label(&cpt, LabelCpts::Value).as_deref(), Some("10k"));
        assert_eq!(
            component_label(&cpt, LabelCpts::ValueName).as_deref(),
            Some("R1=10k")
        );
        assert_eq!(component_label(&cpt, LabelCpts::None), None);
    }

    #[test]
    fn test_save_writes_document() {
        let registry = ComponentRegistry::new().unwrap();
        let circuit = divider(&registry);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("divider.svg");

        let document = render(&circuit, &Preferences::default(), None).unwrap();
        save(&document, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<svg"));
        assert!(text.contains(r#"viewBox="-1 -1 6 2""#));
    }
}
