// value.rs — Parameter values and node output data
//
// Parameter values are the typed form of script literals, checked against a
// delegate's schema at assignment time. Outputs are what a node exposes to
// its consumers: a numeric matrix or a pixel surface, described up front by
// an `OutputDesc` declared during setup.

use std::fmt;

use serde::Serialize;

use crate::ast::Literal;

// ── Parameters ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParamType {
    Bool,
    Int,
    Real,
    Str,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::Bool => "bool",
            ParamType::Int => "integer",
            ParamType::Real => "real",
            ParamType::Str => "string",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
}

impl ParamValue {
    pub fn ty(&self) -> ParamType {
        match self {
            ParamValue::Bool(_) => ParamType::Bool,
            ParamValue::Int(_) => ParamType::Int,
            ParamValue::Real(_) => ParamType::Real,
            ParamValue::Str(_) => ParamType::Str,
        }
    }

    /// Convert a literal to a value of type `expected`.
    ///
    /// Integers widen to reals; every other mismatch is an error carrying the
    /// literal's own type.
    pub fn from_literal(lit: &Literal, expected: ParamType) -> Result<ParamValue, ParamType> {
        let value = match lit {
            Literal::Bool(b, _) => ParamValue::Bool(*b),
            Literal::Int(i, _) => ParamValue::Int(*i),
            Literal::Real(r, _) => ParamValue::Real(*r),
            Literal::StringLit(s, _) => ParamValue::Str(s.clone()),
        };
        match (value, expected) {
            (ParamValue::Int(i), ParamType::Real) => Ok(ParamValue::Real(i as f64)),
            (v, t) if v.ty() == t => Ok(v),
            (v, _) => Err(v.ty()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            ParamValue::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

// ── Outputs ──

/// What kind of data a node produces or an input slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputKind {
    Matrix,
    Surface,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Matrix => write!(f, "matrix"),
            OutputKind::Surface => write!(f, "surface"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementType {
    F32,
    Rgba8,
}

/// Shape of a node's output, declared once during setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputDesc {
    pub kind: OutputKind,
    pub element: ElementType,
    pub width: usize,
    pub height: usize,
}

impl OutputDesc {
    pub fn matrix(width: usize, height: usize) -> Self {
        OutputDesc {
            kind: OutputKind::Matrix,
            element: ElementType::F32,
            width,
            height,
        }
    }

    pub fn surface(width: usize, height: usize) -> Self {
        OutputDesc {
            kind: OutputKind::Surface,
            element: ElementType::Rgba8,
            width,
            height,
        }
    }
}

/// Row-major `f32` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Matrix {
    pub fn zeros(width: usize, height: usize) -> Self {
        Matrix {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        self.data[y * self.width + x] = v;
    }
}

/// Row-major RGBA8 pixel surface, one `u32` per pixel (0xRRGGBBAA).
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl Surface {
    pub fn new(width: usize, height: usize) -> Self {
        Surface {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }
}

/// Borrowed view of a node's current output.
#[derive(Debug, Clone, Copy)]
pub enum Output<'a> {
    Matrix(&'a Matrix),
    Surface(&'a Surface),
}

impl Output<'_> {
    pub fn kind(&self) -> OutputKind {
        match self {
            Output::Matrix(_) => OutputKind::Matrix,
            Output::Surface(_) => OutputKind::Surface,
        }
    }
}
