//! Operation vocabulary: kinds, transactions, attributes and steps
//!
//! Every step has a compact token form used for display and for comparing
//! schedules against the session history:
//!
//! | token    | meaning                           |
//! |----------|-----------------------------------|
//! | `b1`     | begin of T1                       |
//! | `l2A`    | T2 locks A                        |
//! | `o1B*3`  | T1 computes `b = b * 3`           |
//! | `c2`     | commit of T2                      |

use crate::error::{ScheduleError, ScheduleResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of operation a transaction performs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Begin of transaction (BOT)
    Begin,
    /// Acquire the lock on an attribute
    Lock,
    /// Read an attribute into the local copy
    Read,
    /// Update the local copy with an operator and operand
    Compute,
    /// Write the local copy back
    Write,
    /// Release the lock on an attribute
    Unlock,
    /// Commit
    Commit,
}

impl OpKind {
    /// All kinds in vocabulary order
    pub const ALL: [OpKind; 7] = [
        OpKind::Begin,
        OpKind::Lock,
        OpKind::Read,
        OpKind::Compute,
        OpKind::Write,
        OpKind::Unlock,
        OpKind::Commit,
    ];

    /// Single-letter code of this kind
    pub fn code(self) -> char {
        match self {
            OpKind::Begin => 'b',
            OpKind::Lock => 'l',
            OpKind::Read => 'r',
            OpKind::Compute => 'o',
            OpKind::Write => 'w',
            OpKind::Unlock => 'u',
            OpKind::Commit => 'c',
        }
    }

    /// Look up a kind by its code
    pub fn from_code(code: char) -> ScheduleResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or(ScheduleError::UnknownOperationKind(code))
    }

    /// Whether instances of this kind exist once per attribute
    pub fn is_attribute_scoped(self) -> bool {
        !matches!(self, OpKind::Begin | OpKind::Commit)
    }
}

/// Transaction identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TxId {
    /// First transaction
    T1,
    /// Second transaction
    T2,
}

impl TxId {
    /// Both transactions in order
    pub const ALL: [TxId; 2] = [TxId::T1, TxId::T2];

    /// Transaction number (1 or 2)
    pub fn number(self) -> u8 {
        match self {
            TxId::T1 => 1,
            TxId::T2 => 2,
        }
    }

    /// The other transaction
    pub fn other(self) -> Self {
        match self {
            TxId::T1 => TxId::T2,
            TxId::T2 => TxId::T1,
        }
    }

    fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '1' => Some(TxId::T1),
            '2' => Some(TxId::T2),
            _ => None,
        }
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.number())
    }
}

/// Shared data item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribute {
    /// Attribute A
    A,
    /// Attribute B
    B,
}

impl Attribute {
    /// Both attributes in order
    pub const ALL: [Attribute; 2] = [Attribute::A, Attribute::B];

    /// Upper-case name used in tokens
    pub fn as_char(self) -> char {
        match self {
            Attribute::A => 'A',
            Attribute::B => 'B',
        }
    }

    /// Lower-case name of a transaction's local copy
    pub fn local_name(self) -> char {
        self.as_char().to_ascii_lowercase()
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(Attribute::A),
            'B' => Some(Attribute::B),
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Arithmetic operator of a compute step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// `value + operand`
    Add,
    /// `value * operand`
    Mul,
}

impl Operator {
    /// Symbol used in tokens
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Mul => '*',
        }
    }

    /// Apply to a value. Saturates instead of overflowing.
    pub fn apply(self, value: i64, operand: i64) -> i64 {
        match self {
            Operator::Add => value.saturating_add(operand),
            Operator::Mul => value.saturating_mul(operand),
        }
    }

    fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '*' | '×' => Some(Operator::Mul),
            _ => None,
        }
    }
}

/// Parameters of a compute step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Compute {
    /// Operator
    pub operator: Operator,
    /// Right-hand operand
    pub operand: i64,
}

impl Compute {
    /// Create compute parameters
    pub fn new(operator: Operator, operand: i64) -> Self {
        Self { operator, operand }
    }

    /// Apply to a value
    pub fn apply(&self, value: i64) -> i64 {
        self.operator.apply(value, self.operand)
    }
}

/// Identity of a step: kind, transaction and (for scoped kinds) attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepKey {
    /// Operation kind
    pub kind: OpKind,
    /// Acting transaction
    pub tx: TxId,
    /// Attribute, for attribute-scoped kinds
    pub attr: Option<Attribute>,
}

impl StepKey {
    /// Key of an attribute-scoped step
    pub fn scoped(kind: OpKind, tx: TxId, attr: Attribute) -> Self {
        Self {
            kind,
            tx,
            attr: Some(attr),
        }
    }

    /// Key of a transaction-scoped step (begin, commit)
    pub fn unscoped(kind: OpKind, tx: TxId) -> Self {
        Self {
            kind,
            tx,
            attr: None,
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.code(), self.tx.number())?;
        if let Some(attr) = self.attr {
            write!(f, "{}", attr)?;
        }
        Ok(())
    }
}

/// The 24 step keys every schedule consists of
///
/// Ordered by kind, then transaction, then attribute.
pub fn step_set() -> Vec<StepKey> {
    let mut steps = Vec::with_capacity(24);
    for kind in OpKind::ALL {
        for tx in TxId::ALL {
            if kind.is_attribute_scoped() {
                for attr in Attribute::ALL {
                    steps.push(StepKey::scoped(kind, tx, attr));
                }
            } else {
                steps.push(StepKey::unscoped(kind, tx));
            }
        }
    }
    steps
}

/// An instantiated step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Step {
    /// Step identity
    pub key: StepKey,
    /// Operator and operand; only set on compute steps
    pub compute: Option<Compute>,
}

impl Step {
    /// Create a step without compute parameters
    pub fn new(key: StepKey) -> Self {
        Self { key, compute: None }
    }

    /// Create a compute step
    pub fn compute(tx: TxId, attr: Attribute, operator: Operator, operand: i64) -> Self {
        Self {
            key: StepKey::scoped(OpKind::Compute, tx, attr),
            compute: Some(Compute::new(operator, operand)),
        }
    }

    /// Operation kind
    pub fn kind(&self) -> OpKind {
        self.key.kind
    }

    /// Acting transaction
    pub fn tx(&self) -> TxId {
        self.key.tx
    }

    /// Attribute, if scoped
    pub fn attr(&self) -> Option<Attribute> {
        self.key.attr
    }
}

impl From<StepKey> for Step {
    fn from(key: StepKey) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        if let Some(compute) = self.compute {
            write!(f, "{}{}", compute.operator.symbol(), compute.operand)?;
        }
        Ok(())
    }
}

impl FromStr for Step {
    type Err = ScheduleError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let malformed = || ScheduleError::MalformedSchedule(format!("invalid step token {token:?}"));
        let mut chars = token.chars();

        let kind = OpKind::from_code(chars.next().ok_or_else(malformed)?)?;
        let tx = chars.next().and_then(TxId::from_digit).ok_or_else(malformed)?;

        if !kind.is_attribute_scoped() {
            if chars.next().is_some() {
                return Err(malformed());
            }
            return Ok(Step::new(StepKey::unscoped(kind, tx)));
        }

        let attr = chars.next().and_then(Attribute::from_char).ok_or_else(malformed)?;
        let key = StepKey::scoped(kind, tx, attr);

        let rest: String = chars.collect();
        if rest.is_empty() {
            return Ok(Step::new(key));
        }
        if kind != OpKind::Compute {
            return Err(malformed());
        }

        let mut rest = rest.chars();
        let operator = rest.next().and_then(Operator::from_symbol).ok_or_else(malformed)?;
        let operand = rest.as_str().parse::<i64>().map_err(|_| malformed())?;

        Ok(Step {
            key,
            compute: Some(Compute::new(operator, operand)),
        })
    }
}

impl From<Step> for String {
    fn from(step: Step) -> Self {
        step.to_string()
    }
}

impl TryFrom<String> for Step {
    type Error = ScheduleError;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        token.parse()
    }
}

/// An ordered interleaving of steps
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule {
    /// Steps in execution order
    pub steps: Vec<Step>,
}

impl Schedule {
    /// Create a schedule from steps
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Token form of every step, in order
    pub fn tokens(&self) -> Vec<String> {
        self.steps.iter().map(Step::to_string).collect()
    }

    /// Step keys in order
    pub fn keys(&self) -> impl Iterator<Item = StepKey> + '_ {
        self.steps.iter().map(|step| step.key)
    }

    /// Steps in order
    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the schedule has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    /// Parse tokens separated by whitespace or commas
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let steps = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .map(str::parse)
            .collect::<ScheduleResult<Vec<Step>>>()?;
        Ok(Self::new(steps))
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens().join(" "))
    }
}
