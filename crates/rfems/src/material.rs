//! Electromagnetic material properties and the named conductor table

use serde::Serialize;

/// Bulk conductors recognized by name, conductivity in S/m.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conductor {
    Silver,
    Copper,
    Gold,
    Aluminum,
    Brass,
    Steel,
}

impl Conductor {
    pub const ALL: [Conductor; 6] = [
        Conductor::Silver,
        Conductor::Copper,
        Conductor::Gold,
        Conductor::Aluminum,
        Conductor::Brass,
        Conductor::Steel,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Conductor::Silver => "silver",
            Conductor::Copper => "copper",
            Conductor::Gold => "gold",
            Conductor::Aluminum => "aluminum",
            Conductor::Brass => "brass",
            Conductor::Steel => "steel",
        }
    }

    pub fn conductivity(self) -> f64 {
        match self {
            Conductor::Silver => 62.1e6,
            Conductor::Copper => 58.7e6,
            Conductor::Gold => 44.2e6,
            Conductor::Aluminum => 36.9e6,
            Conductor::Brass => 15.9e6,
            Conductor::Steel => 10.1e6,
        }
    }

    pub fn color(self) -> Color {
        match self {
            Conductor::Silver => Color::rgb(0xc0, 0xc0, 0xc0),
            Conductor::Copper => Color::rgb(0xe6, 0xbe, 0x8a),
            Conductor::Gold => Color::rgb(0xff, 0xd7, 0x00),
            Conductor::Aluminum => Color::rgb(0xd0, 0xd5, 0xd9),
            Conductor::Brass => Color::rgb(0xac, 0x9f, 0x3c),
            Conductor::Steel => Color::rgb(0x88, 0x8b, 0x8d),
        }
    }
}

/// Display color handed to the structure viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const PEC: Color = Color::rgb(0xdb, 0xc7, 0xb8);
}

/// Parameters of a user-defined dielectric, as given in the model name.
/// Absent keys stay `None`; the solver defaults apply.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CustomDielectric {
    /// Relative permittivity
    pub epsilon: Option<f64>,
    /// Electric conductivity (S/m)
    pub kappa: Option<f64>,
}

impl CustomDielectric {
    pub fn is_empty(&self) -> bool {
        self.epsilon.is_none() && self.kappa.is_none()
    }
}

/// First token of the material part of a model name.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialTag {
    /// Excluded from the simulation
    Air,
    /// Perfect electric conductor
    Pec,
    /// Lumped port, never a material
    Port,
    Conductor(Conductor),
    /// Anything else: a dielectric described by `epsilon=`/`kappa=` keys
    Custom(String),
}

impl MaterialTag {
    pub fn from_token(token: &str) -> Self {
        match token {
            "air" => MaterialTag::Air,
            "pec" => MaterialTag::Pec,
            "port" => MaterialTag::Port,
            other => match Conductor::from_name(other) {
                Some(conductor) => MaterialTag::Conductor(conductor),
                None => MaterialTag::Custom(other.to_string()),
            },
        }
    }

    pub fn color(&self) -> Option<Color> {
        match self {
            MaterialTag::Pec => Some(Color::PEC),
            MaterialTag::Conductor(c) => Some(c.color()),
            _ => None,
        }
    }
}

/// What the solver is told to fill a structure with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialKind {
    PerfectConductor,
    Conductor { conductivity: f64 },
    Dielectric {
        epsilon: Option<f64>,
        conductivity: Option<f64>,
    },
}

/// Resolved material for one structure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialSpec {
    pub kind: MaterialKind,
    pub priority: i32,
    pub color: Option<Color>,
}

impl MaterialSpec {
    /// Resolve a decoded tag. `None` for air and ports, which never become
    /// materials. With `force_pec` every remaining structure is a perfect
    /// conductor. A custom tag with no parameters is also a perfect conductor.
    pub fn resolve(
        tag: &MaterialTag,
        custom: CustomDielectric,
        priority: i32,
        force_pec: bool,
    ) -> Option<Self> {
        let kind = match tag {
            MaterialTag::Air | MaterialTag::Port => return None,
            _ if force_pec => MaterialKind::PerfectConductor,
            MaterialTag::Pec => MaterialKind::PerfectConductor,
            MaterialTag::Conductor(c) => MaterialKind::Conductor {
                conductivity: c.conductivity(),
            },
            MaterialTag::Custom(_) if custom.is_empty() => MaterialKind::PerfectConductor,
            MaterialTag::Custom(_) => MaterialKind::Dielectric {
                epsilon: custom.epsilon,
                conductivity: custom.kappa,
            },
        };
        Some(Self {
            kind,
            priority,
            color: tag.color(),
        })
    }

    pub fn is_pec(&self) -> bool {
        self.kind == MaterialKind::PerfectConductor
    }
}
