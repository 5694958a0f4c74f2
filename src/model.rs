use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::{PrepError, Result};
use crate::matrix::{Matrix, Shape};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Node(String),
    Const(f64),
    Add(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Dot(Box<Expr>, Box<Expr>),
    /// `1` where the operand is strictly positive, `0` elsewhere.
    Positive(Box<Expr>),
}

impl Expr {
    pub fn node(name: impl Into<String>) -> Self {
        Expr::Node(name.into())
    }

    pub fn dot(lhs: Expr, rhs: Expr) -> Self {
        Expr::Dot(Box::new(lhs), Box::new(rhs))
    }

    pub fn add(self, rhs: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(rhs))
    }

    pub fn mul(self, rhs: Expr) -> Self {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }

    pub fn positive(self) -> Self {
        Expr::Positive(Box::new(self))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Node(name) => write!(f, "{name}"),
            Expr::Const(value) => write!(f, "{value}"),
            Expr::Add(lhs, rhs) => write!(f, "({lhs} + {rhs})"),
            Expr::Mul(lhs, rhs) => write!(f, "{lhs} * {rhs}"),
            Expr::Dot(lhs, rhs) => write!(f, "dot({lhs}, {rhs})"),
            Expr::Positive(inner) => write!(f, "[{inner} > 0]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Spread {
    Tau(Expr),
    Sigma(Expr),
}

impl Spread {
    fn expr(&self) -> &Expr {
        match self {
            Spread::Tau(expr) | Spread::Sigma(expr) => expr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Distribution {
    Normal { mu: Expr, spread: Spread },
    Gamma { alpha: f64, beta: f64 },
    HalfCauchy { beta: f64 },
}

impl Distribution {
    pub fn normal(mu: Expr, spread: Spread) -> Self {
        Distribution::Normal { mu, spread }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Normal {
                mu,
                spread: Spread::Tau(tau),
            } => write!(f, "Normal(mu={mu}, tau={tau})"),
            Distribution::Normal {
                mu,
                spread: Spread::Sigma(sigma),
            } => write!(f, "Normal(mu={mu}, sigma={sigma})"),
            Distribution::Gamma { alpha, beta } => write!(f, "Gamma(alpha={alpha}, beta={beta})"),
            Distribution::HalfCauchy { beta } => write!(f, "HalfCauchy(beta={beta})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind<'a> {
    Data { values: &'a Matrix },
    Latent { distribution: Distribution },
    Deterministic { expr: Expr },
    Observed { distribution: Distribution, observed: Expr },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node<'a> {
    pub name: String,
    pub shape: Shape,
    #[serde(flatten)]
    pub kind: NodeKind<'a>,
}

impl Node<'_> {
    pub fn is_latent(&self) -> bool {
        matches!(self.kind, NodeKind::Latent { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelGraph<'a> {
    pub name: String,
    nodes: Vec<Node<'a>>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl<'a> ModelGraph<'a> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn nodes(&self) -> &[Node<'a>] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&Node<'a>> {
        self.index.get(name).map(|idx| &self.nodes[*idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn latent_names(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.is_latent())
            .map(|n| n.name.as_str())
            .collect()
    }

    pub fn data(&mut self, name: &str, values: &'a Matrix) -> Result<Expr> {
        self.push(name, values.shape(), NodeKind::Data { values })
    }

    pub fn latent(&mut self, name: &str, shape: Shape, distribution: Distribution) -> Result<Expr> {
        self.check_distribution(name, shape, &distribution)?;
        self.push(name, shape, NodeKind::Latent { distribution })
    }

    pub fn deterministic(&mut self, name: &str, expr: Expr) -> Result<Expr> {
        let shape = self.shape_of(&expr)?;
        self.push(name, shape, NodeKind::Deterministic { expr })
    }

    /// Declares a likelihood over `observed`. The distribution's mean must have
    /// exactly the observed shape.
    pub fn observed(
        &mut self,
        name: &str,
        distribution: Distribution,
        observed: Expr,
    ) -> Result<()> {
        let shape = self.shape_of(&observed)?;
        if let Distribution::Normal { mu, .. } = &distribution {
            let mu_shape = self.shape_of(mu)?;
            if mu_shape != shape {
                return Err(PrepError::mismatch(format!("mean of {name}"), shape, mu_shape));
            }
        }
        self.check_distribution(name, shape, &distribution)?;
        self.push(
            name,
            shape,
            NodeKind::Observed {
                distribution,
                observed,
            },
        )?;
        Ok(())
    }

    pub fn shape_of(&self, expr: &Expr) -> Result<Shape> {
        match expr {
            Expr::Node(name) => self
                .node(name)
                .map(|n| n.shape)
                .ok_or_else(|| PrepError::UnknownNode(name.clone())),
            Expr::Const(_) => Ok(Shape::SCALAR),
            Expr::Add(lhs, rhs) | Expr::Mul(lhs, rhs) => {
                let (l, r) = (self.shape_of(lhs)?, self.shape_of(rhs)?);
                if l == r || r.is_scalar() {
                    Ok(l)
                } else if l.is_scalar() {
                    Ok(r)
                } else {
                    Err(PrepError::mismatch(format!("operands of {expr}"), l, r))
                }
            }
            Expr::Dot(lhs, rhs) => {
                let (l, r) = (self.shape_of(lhs)?, self.shape_of(rhs)?);
                if l.cols != r.rows {
                    return Err(PrepError::mismatch(
                        format!("inner dimension of {expr}"),
                        Shape::new(l.cols, r.cols),
                        r,
                    ));
                }
                Ok(Shape::new(l.rows, r.cols))
            }
            Expr::Positive(inner) => self.shape_of(inner),
        }
    }

    fn check_distribution(&self, name: &str, shape: Shape, distribution: &Distribution) -> Result<()> {
        match distribution {
            Distribution::Normal { mu, spread } => {
                let mu_shape = self.shape_of(mu)?;
                if mu_shape != shape && !mu_shape.is_scalar() {
                    return Err(PrepError::mismatch(format!("mean of {name}"), shape, mu_shape));
                }
                if let Expr::Const(value) = mu
                    && !value.is_finite()
                {
                    return Err(PrepError::Configuration(format!(
                        "mean of {name} must be finite, got {value}"
                    )));
                }
                let spread_shape = self.shape_of(spread.expr())?;
                if spread_shape != shape && !spread_shape.is_scalar() {
                    return Err(PrepError::mismatch(
                        format!("spread of {name}"),
                        shape,
                        spread_shape,
                    ));
                }
                if let Expr::Const(value) = spread.expr()
                    && !(value.is_finite() && *value > 0.0)
                {
                    return Err(PrepError::Configuration(format!(
                        "spread of {name} must be positive, got {value}"
                    )));
                }
            }
            Distribution::Gamma { alpha, beta } => {
                if !(*alpha > 0.0 && *beta > 0.0) {
                    return Err(PrepError::Configuration(format!(
                        "{name}: gamma parameters must be positive"
                    )));
                }
            }
            Distribution::HalfCauchy { beta } => {
                if !(*beta > 0.0) {
                    return Err(PrepError::Configuration(format!(
                        "{name}: half-cauchy scale must be positive"
                    )));
                }
            }
        }
        Ok(())
    }

    fn push(&mut self, name: &str, shape: Shape, kind: NodeKind<'a>) -> Result<Expr> {
        if self.index.contains_key(name) {
            return Err(PrepError::DuplicateNode(name.to_string()));
        }
        debug!("{}: declared {name} {shape}", self.name);
        self.index.insert(name.to_string(), self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            shape,
            kind,
        });
        Ok(Expr::node(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_hyper(graph: &mut ModelGraph<'_>, name: &str) -> Expr {
        graph
            .latent(name, Shape::SCALAR, Distribution::HalfCauchy { beta: 2.0 })
            .unwrap()
    }

    #[test]
    fn dot_requires_matching_inner_dimension() {
        let design = Matrix::allocate(5, 3);
        let mut graph = ModelGraph::new("test");
        let x = graph.data("x", &design).unwrap();
        let sigma = scalar_hyper(&mut graph, "sigma");
        let good = graph
            .latent(
                "good",
                Shape::column(3),
                Distribution::normal(Expr::Const(0.0), Spread::Sigma(sigma.clone())),
            )
            .unwrap();
        let bad = graph
            .latent(
                "bad",
                Shape::column(4),
                Distribution::normal(Expr::Const(0.0), Spread::Sigma(sigma)),
            )
            .unwrap();

        assert_eq!(
            Shape::column(5),
            graph.shape_of(&Expr::dot(x.clone(), good)).unwrap()
        );
        let err = graph.deterministic("mu", Expr::dot(x, bad)).unwrap_err();
        assert!(matches!(err, PrepError::DimensionMismatch { .. }));
        assert!(!graph.contains("mu"));
    }

    #[test]
    fn elementwise_broadcasts_scalars_only() {
        let a = Matrix::allocate(4, 1);
        let b = Matrix::allocate(3, 1);
        let mut graph = ModelGraph::new("test");
        let a = graph.data("a", &a).unwrap();
        let b = graph.data("b", &b).unwrap();
        assert_eq!(
            Shape::column(4),
            graph.shape_of(&a.clone().mul(Expr::Const(2.0))).unwrap()
        );
        assert_eq!(
            Shape::column(4),
            graph.shape_of(&Expr::Const(2.0).add(a.clone())).unwrap()
        );
        assert!(graph.shape_of(&a.add(b)).is_err());
    }

    #[test]
    fn normal_mean_must_match_declared_shape() {
        let priors = Matrix::column(vec![0.0; 3]);
        let mut graph = ModelGraph::new("test");
        let priors = graph.data("priors", &priors).unwrap();
        let sigma = scalar_hyper(&mut graph, "sigma");
        let err = graph
            .latent(
                "strength",
                Shape::column(2),
                Distribution::normal(priors, Spread::Sigma(sigma)),
            )
            .unwrap_err();
        assert!(matches!(err, PrepError::DimensionMismatch { .. }));
    }

    #[test]
    fn names_are_unique_and_references_resolved() {
        let values = Matrix::column(vec![1.0]);
        let mut graph = ModelGraph::new("test");
        graph.data("x", &values).unwrap();
        assert!(matches!(
            graph.data("x", &values),
            Err(PrepError::DuplicateNode(_))
        ));
        assert!(matches!(
            graph.deterministic("y", Expr::node("missing")),
            Err(PrepError::UnknownNode(_))
        ));
    }

    #[test]
    fn fixed_spread_must_be_positive() {
        let mut graph = ModelGraph::new("test");
        let err = graph
            .latent(
                "advantage",
                Shape::SCALAR,
                Distribution::normal(Expr::Const(4.0), Spread::Sigma(Expr::Const(0.0))),
            )
            .unwrap_err();
        assert!(matches!(err, PrepError::Configuration(_)));
    }

    #[test]
    fn observed_mean_must_match_data() {
        let scores = Matrix::column(vec![1.0, 2.0]);
        let mut graph = ModelGraph::new("test");
        let scores = graph.data("scores", &scores).unwrap();
        let sigma = scalar_hyper(&mut graph, "sigma");
        let err = graph
            .observed(
                "observed",
                Distribution::normal(Expr::Const(0.0), Spread::Sigma(sigma)),
                scores,
            )
            .unwrap_err();
        assert!(matches!(err, PrepError::DimensionMismatch { .. }));
    }

    #[test]
    fn expr_display_reads_like_a_formula() {
        let expr = Expr::dot(Expr::node("x"), Expr::node("beta"))
            .add(Expr::node("a").mul(Expr::node("h")));
        assert_eq!("(dot(x, beta) + a * h)", expr.to_string());
        assert_eq!("[(a + c) > 0]", Expr::node("a").add(Expr::node("c")).positive().to_string());
    }
}
