//! CSXCAD/openEMS XML generation

use crate::error::{Error, Result};
use crate::geometry::{Axis, BoundingBox, Vec3};
use crate::material::{Color, MaterialKind};
use crate::port::LumpedPort;
use crate::simulation::{Boundary, Nf2ffBox, Scene};
use crate::solver::probe::{current_probe, voltage_probe};
use crate::sparams::AngularGrid;
use crate::structure::Primitive;
use minijinja::{context, Environment, Output, State};
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::path::Path;

/// Timestep limit when none is configured.
const DEFAULT_TIMESTEPS: u64 = 1_000_000_000;
/// Energy decay ratio when none is configured (-50 dB).
const DEFAULT_END_CRITERIA: f64 = 1e-5;

/// Name shared by the near-field dump boxes and their files.
pub const NF2FF_NAME: &str = "nf2ff";

const PORT_COLOR: Color = Color::rgb(0xff, 0x00, 0x00);
const PROBE_COLOR: Color = Color::rgb(0x00, 0x80, 0xff);

const MODEL_TEMPLATE: &str = r##"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<!-- {{ header_comment }} -->
<!-- Generated: {{ timestamp }} -->
<openEMS>
  <FDTD NumberOfTimesteps="{{ timesteps }}" endCriteria="{{ end_criteria }}" f_max="{{ f_max }}"{% if cell_constant_material %} CellConstantMaterial="1"{% endif %}>
    <Excitation Type="0" f0="{{ f0 }}" fc="{{ fc }}"/>
    <BoundaryCond{% for face in boundary %} {{ face.name }}="{{ face.kind }}"{% endfor %}/>
  </FDTD>
  <ContinuousStructure CoordSystem="0">
    <Properties>
{% for p in properties %}
      <{{ p.tag }} Name="{{ p.name }}"{% for a in p.attrs %} {{ a[0] }}="{{ a[1] }}"{% endfor %}>
{% if p.color %}
        <FillColor R="{{ p.color.r }}" G="{{ p.color.g }}" B="{{ p.color.b }}" a="255"/>
        <EdgeColor R="{{ p.color.r }}" G="{{ p.color.g }}" B="{{ p.color.b }}" a="255"/>
{% endif %}
{% if p.property %}
        <Property{% for a in p.property %} {{ a[0] }}="{{ a[1] }}"{% endfor %}/>
{% endif %}
        <Primitives>
{% for prim in p.primitives %}
{% if prim.file %}
          <PolyhedronReader Priority="{{ prim.priority }}" FileName="{{ prim.file }}" FileType="1"/>
{% else %}
          <Box Priority="{{ prim.priority }}">
            <P1 X="{{ prim.p1[0] }}" Y="{{ prim.p1[1] }}" Z="{{ prim.p1[2] }}"/>
            <P2 X="{{ prim.p2[0] }}" Y="{{ prim.p2[1] }}" Z="{{ prim.p2[2] }}"/>
          </Box>
{% endif %}
{% endfor %}
        </Primitives>
      </{{ p.tag }}>
{% endfor %}
    </Properties>
    <RectilinearGrid DeltaUnit="{{ delta_unit }}" CoordSystem="0">
      <XLines>{{ x_lines }}</XLines>
      <YLines>{{ y_lines }}</YLines>
      <ZLines>{{ z_lines }}</ZLines>
    </RectilinearGrid>
  </ContinuousStructure>
</openEMS>
"##;

const NF2FF_TEMPLATE: &str = r##"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<nf2ff Outfile="{{ outfile }}" freq="{{ freq }}" theta="{{ theta }}" phi="{{ phi }}" Center="{{ center }}" Radius="{{ radius }}" Verbose="{{ verbose }}">
{% for plane in planes %}
  <Planes E_Field="{{ plane.e_field }}" H_Field="{{ plane.h_field }}"/>
{% endfor %}
</nf2ff>
"##;

/// Write `value` into an attribute or text node, escaping XML markup in strings.
fn xml_formatter(
    out: &mut Output<'_>,
    _state: &State<'_, '_>,
    value: &minijinja::Value,
) -> std::result::Result<(), minijinja::Error> {
    let Some(text) = value.as_str() else {
        write!(out, "{value}")?;
        return Ok(());
    };
    for c in text.chars() {
        match c {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '"' => out.write_str("&quot;")?,
            '\'' => out.write_str("&apos;")?,
            c => out.write_char(c)?,
        }
    }
    Ok(())
}

fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_formatter(xml_formatter);
    env.add_template("model.xml", MODEL_TEMPLATE)?;
    env.add_template("nf2ff.xml", NF2FF_TEMPLATE)?;
    Ok(env)
}

fn point(v: &Vec3) -> Value {
    json!([v.x, v.y, v.z])
}

fn join(values: impl IntoIterator<Item = f64>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn box_primitive(bbox: &BoundingBox, priority: i32) -> Value {
    json!({
        "priority": priority,
        "p1": point(&bbox.min),
        "p2": point(&bbox.max),
    })
}

fn color(c: Option<Color>) -> Value {
    c.map(|c| json!(c)).unwrap_or(Value::Null)
}

fn property(tag: &str, name: &str, attrs: Value, fill: Option<Color>, primitives: Vec<Value>) -> Value {
    json!({
        "tag": tag,
        "name": name,
        "attrs": attrs,
        "color": color(fill),
        "property": Value::Null,
        "primitives": primitives,
    })
}

/// One entry per structure of the scene.
fn structure_properties(scene: &Scene) -> Vec<Value> {
    scene
        .structure
        .properties
        .iter()
        .map(|p| {
            let primitives: Vec<Value> = p
                .primitives
                .iter()
                .map(|prim| match prim {
                    Primitive::Box { bbox, priority } => box_primitive(bbox, *priority),
                    Primitive::Polyhedron { path, priority } => json!({
                        "priority": priority,
                        "file": path.display().to_string(),
                    }),
                })
                .collect();

            let (tag, material) = match p.material.kind {
                MaterialKind::PerfectConductor => ("Metal", Value::Null),
                MaterialKind::Conductor { conductivity } => {
                    ("Material", json!([["Kappa", conductivity]]))
                }
                MaterialKind::Dielectric {
                    epsilon,
                    conductivity,
                } => {
                    let mut attrs = Vec::new();
                    if let Some(e) = epsilon {
                        attrs.push(json!(["Epsilon", e]));
                    }
                    if let Some(k) = conductivity {
                        attrs.push(json!(["Kappa", k]));
                    }
                    ("Material", Value::Array(attrs))
                }
            };

            let mut view = property(tag, &p.name, json!([]), p.material.color, primitives);
            view["property"] = material;
            view
        })
        .collect()
}

/// Lumped element, optional excitation and the two probes of a port.
pub fn port_properties(port: &LumpedPort) -> Result<Vec<Value>> {
    let axis = port.direction;
    let (start, stop) = (port.bbox.start(axis), port.bbox.stop(axis));
    if start == stop {
        return Err(Error::InvalidConfig(format!(
            "port {} has no extent along its direction {}",
            port.number, axis
        )));
    }
    let sign = (stop - start).signum();
    let n = port.number;
    let mut props = Vec::with_capacity(4);

    let element = box_primitive(&port.bbox, port.priority);
    if port.impedance > 0.0 {
        props.push(property(
            "LumpedElement",
            &format!("port_resist_{n}"),
            json!([["Direction", axis.index()], ["Caps", 1], ["R", port.impedance]]),
            Some(PORT_COLOR),
            vec![element],
        ));
    } else {
        props.push(property(
            "Metal",
            &format!("port_resist_{n}"),
            json!([]),
            Some(PORT_COLOR),
            vec![element],
        ));
    }

    if port.excite {
        let mut vector = [0.0; 3];
        vector[axis.index()] = -sign;
        props.push(property(
            "Excitation",
            &format!("port_excite_{n}"),
            json!([["Type", 0], ["Excite", join(vector)]]),
            Some(PORT_COLOR),
            vec![box_primitive(&port.bbox, port.priority)],
        ));
    }

    // voltage along the port axis through its center
    let center = port.bbox.center();
    let mut u_min = center;
    let mut u_max = center;
    u_min[axis.index()] = port.bbox.min[axis.index()];
    u_max[axis.index()] = port.bbox.max[axis.index()];
    props.push(property(
        "ProbeBox",
        &voltage_probe(n),
        json!([["Type", 0], ["Weight", -sign]]),
        Some(PROBE_COLOR),
        vec![box_primitive(&BoundingBox::new(u_min, u_max), 0)],
    ));

    // current through the mid-plane
    let mut i_min = port.bbox.min;
    let mut i_max = port.bbox.max;
    i_min[axis.index()] = center[axis.index()];
    i_max[axis.index()] = center[axis.index()];
    props.push(property(
        "ProbeBox",
        &current_probe(n),
        json!([["Type", 1], ["Weight", sign], ["NormDir", axis.index()]]),
        Some(PROBE_COLOR),
        vec![box_primitive(&BoundingBox::new(i_min, i_max), 0)],
    ));

    Ok(props)
}

/// Face suffixes of the near-field box: `xn`, `xp`, `yn`, ...
fn faces() -> impl Iterator<Item = (Axis, bool, String)> {
    Axis::ALL.into_iter().flat_map(|axis| {
        [false, true].map(|upper| {
            let suffix = format!("{}{}", axis.letter(), if upper { 'p' } else { 'n' });
            (axis, upper, suffix)
        })
    })
}

/// Time-domain E and H dump planes on the six faces of the near-field box.
fn nf2ff_properties(nf2ff: &Nf2ffBox) -> Vec<Value> {
    let mut props = Vec::with_capacity(12);
    for (axis, upper, suffix) in faces() {
        let mut plane = nf2ff.bbox;
        let i = axis.index();
        if upper {
            plane.min[i] = plane.max[i];
        } else {
            plane.max[i] = plane.min[i];
        }
        for (field, dump_type) in [("E", 0), ("H", 1)] {
            props.push(property(
                "DumpBox",
                &format!("{NF2FF_NAME}_{field}_{suffix}"),
                json!([["DumpType", dump_type], ["DumpMode", 1], ["FileType", 1]]),
                None,
                vec![box_primitive(&plane, 0)],
            ));
        }
    }
    props
}

fn boundary_kind(b: Boundary) -> &'static str {
    match b {
        Boundary::Absorbing => "MUR",
        Boundary::PerfectlyReflecting => "PEC",
    }
}

/// Render the full simulation document for `scene`.
pub fn render_model(scene: &Scene) -> Result<String> {
    let env = environment()?;
    let template = env.get_template("model.xml")?;

    let mut properties = structure_properties(scene);
    for port in &scene.ports {
        properties.extend(port_properties(port)?);
    }
    if let Some(nf2ff) = &scene.nf2ff {
        properties.extend(nf2ff_properties(nf2ff));
    }

    let face_names = ["xmin", "xmax", "ymin", "ymax", "zmin", "zmax"];
    let boundary: Vec<Value> = face_names
        .iter()
        .zip(scene.setup.boundary)
        .map(|(name, b)| json!({ "name": name, "kind": boundary_kind(b) }))
        .collect();

    let setup = &scene.setup;
    let output = template.render(context! {
        header_comment => "openEMS simulation generated by rfems",
        timestamp => chrono::Utc::now().to_rfc3339(),
        timesteps => setup.timesteps.unwrap_or(DEFAULT_TIMESTEPS),
        end_criteria => setup.end_criteria.unwrap_or(DEFAULT_END_CRITERIA),
        f_max => setup.excitation.f0 + setup.excitation.fc,
        f0 => setup.excitation.f0,
        fc => setup.excitation.fc,
        cell_constant_material => setup.cell_constant_material,
        boundary => boundary,
        properties => properties,
        delta_unit => scene.delta_unit,
        x_lines => join(scene.mesh.lines(Axis::X)),
        y_lines => join(scene.mesh.lines(Axis::Y)),
        z_lines => join(scene.mesh.lines(Axis::Z)),
    })?;

    Ok(output)
}

/// Render the near-field to far-field job description.
pub fn render_nf2ff(
    nf2ff: &Nf2ffBox,
    delta_unit: f64,
    sim_path: &Path,
    outfile: &str,
    frequency: f64,
    grid: &AngularGrid,
    verbose: u32,
) -> Result<String> {
    let env = environment()?;
    let template = env.get_template("nf2ff.xml")?;

    let planes: Vec<Value> = faces()
        .map(|(_, _, suffix)| {
            json!({
                "e_field": sim_path.join(format!("{NF2FF_NAME}_E_{suffix}.h5")).display().to_string(),
                "h_field": sim_path.join(format!("{NF2FF_NAME}_H_{suffix}.h5")).display().to_string(),
            })
        })
        .collect();

    let center = nf2ff.bbox.center() * delta_unit;
    let output = template.render(context! {
        outfile => sim_path.join(outfile).display().to_string(),
        freq => frequency,
        theta => join(grid.theta_radians()),
        phi => join(grid.phi_radians()),
        center => join([center.x, center.y, center.z]),
        radius => 1,
        verbose => verbose,
        planes => planes,
    })?;

    Ok(output)
}
