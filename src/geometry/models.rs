//! Collision model grammar.
//!
//! A model file is a property table. The key `base` names the root shape; any
//! key may be extended with numbered operation lines:
//!
//! ```text
//! base = ellipse,-165,-165,330,330
//! base.0 = subtract, rect,-165,-165,40,330
//! base.1 = add, mast
//! mast = rect,-5,-5,10,10
//! ```
//!
//! Operands are primitives (`full`, `empty`, `rect,x,y,w,h`,
//! `ellipse,x,y,w,h`, `poly,x1,y1,...`) or the name of another key.

use super::shape::Shape;
use crate::properties::Properties;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    #[error("collision model {0:?} not found")]
    NotFound(String),
    #[error("collision model {model}: reference cycle {chain}")]
    Cycle { model: String, chain: String },
    #[error("collision model {model}: invalid number {token:?} in {line:?}")]
    InvalidNumber {
        model: String,
        line: String,
        token: String,
    },
}

/// Supplies collision model text by name
pub trait ModelSource {
    fn model_text(&self, name: &str) -> Option<String>;
}

pub fn load_model(source: &dyn ModelSource, name: &str) -> Result<Shape, ModelError> {
    let text = source
        .model_text(name)
        .ok_or_else(|| ModelError::NotFound(name.to_string()))?;
    parse_model(name, &text)
}

pub fn parse_model(name: &str, text: &str) -> Result<Shape, ModelError> {
    let props = Properties::parse(text);
    let mut builder = ModelBuilder {
        model: name,
        props: &props,
        in_progress: Vec::new(),
    };
    builder.build("base")
}

enum Op {
    Add,
    Subtract,
    Intersect,
    Xor,
}

struct ModelBuilder<'a> {
    model: &'a str,
    props: &'a Properties,
    in_progress: Vec<String>, // Keys currently being expanded, outermost first
}

impl ModelBuilder<'_> {
    fn build(&mut self, key: &str) -> Result<Shape, ModelError> {
        if self.in_progress.iter().any(|k| k == key) {
            let mut chain = self.in_progress.clone();
            chain.push(key.to_string());
            return Err(ModelError::Cycle {
                model: self.model.to_string(),
                chain: chain.join(" -> "),
            });
        }
        self.in_progress.push(key.to_string());

        let props = self.props;
        let mut shape = self.construct(props.get(key).unwrap_or(""))?;
        for n in 0.. {
            let Some(line) = props.get(&format!("{}.{}", key, n)) else {
                break;
            };
            let Some((op, data)) = line.split_once(',') else {
                continue;
            };
            let op = match op.trim().to_lowercase().as_str() {
                "add" => Op::Add,
                "subtract" => Op::Subtract,
                "intersect" => Op::Intersect,
                "xor" => Op::Xor,
                _ => continue,
            };
            let operand = self.construct(data.trim())?;
            shape = match op {
                Op::Add => shape.union(&operand),
                Op::Subtract => shape.subtract(&operand),
                Op::Intersect => shape.intersect(&operand),
                Op::Xor => shape.xor(&operand),
            };
        }

        self.in_progress.pop();
        Ok(shape)
    }

    fn construct(&mut self, data: &str) -> Result<Shape, ModelError> {
        let tokens: Vec<&str> = data.split(',').map(str::trim).collect();
        let kind = tokens[0].to_lowercase();
        let args = &tokens[1..];

        match kind.as_str() {
            "full" => Ok(Shape::full()),
            "empty" => Ok(Shape::empty()),
            "rect" if args.len() >= 4 => {
                let v = self.numbers(data, &args[..4])?;
                Ok(Shape::rect(v[0], v[1], v[2], v[3]))
            }
            "ellipse" if args.len() >= 4 => {
                let v = self.numbers(data, &args[..4])?;
                Ok(Shape::ellipse(v[0], v[1], v[2], v[3]))
            }
            "poly" if args.len() >= 4 && args.len() % 2 == 0 => {
                let v = self.numbers(data, args)?;
                let points: Vec<(f64, f64)> = v.chunks(2).map(|p| (p[0], p[1])).collect();
                Ok(Shape::polygon(&points))
            }
            _ => {
                let reference = data.trim();
                if !reference.is_empty() && self.props.contains(reference) {
                    self.build(reference)
                } else {
                    Ok(Shape::empty())
                }
            }
        }
    }

    fn numbers(&self, line: &str, tokens: &[&str]) -> Result<Vec<f64>, ModelError> {
        tokens
            .iter()
            .map(|t| {
                t.parse::<f64>().map_err(|_| ModelError::InvalidNumber {
                    model: self.model.to_string(),
                    line: line.to_string(),
                    token: t.to_string(),
                })
            })
            .collect()
    }
}
