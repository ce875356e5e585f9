// Move notation: `[rows]Face[w][2|']`, e.g. `U`, `R'`, `Uw2`, `3Uw'`.

use std::fmt;
use std::str::FromStr;

use crate::error::SearchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Turn {
    Quarter,
    Half,
    Prime,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Step {
    name: String,
    base_len: usize,
    face: char,
    rows: u8,
    wide: bool,
    turn: Turn,
}

impl Step {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> &str {
        &self.name[..self.base_len]
    }

    pub fn face(&self) -> char {
        self.face
    }

    // Number of layers turned: explicit prefix, else 2 for wide turns, else 1.
    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn with_turn(&self, turn: Turn) -> Step {
        let suffix = match turn {
            Turn::Quarter => "",
            Turn::Half => "2",
            Turn::Prime => "'",
        };
        Step {
            name: format!("{}{}", self.base(), suffix),
            turn,
            ..self.clone()
        }
    }

    pub fn inverse(&self) -> Step {
        match self.turn {
            Turn::Quarter => self.with_turn(Turn::Prime),
            Turn::Half => self.clone(),
            Turn::Prime => self.with_turn(Turn::Quarter),
        }
    }

    // True when both steps turn exactly the same physical layer(s), whatever
    // the amount or direction.
    pub fn on_same_face_and_layer(&self, other: &Step) -> bool {
        self.face == other.face && self.rows == other.rows && self.wide == other.wide
    }

    pub fn cancels(&self, prev: &Step) -> bool {
        if self.base() != prev.base() {
            return false;
        }
        matches!(
            (prev.turn, self.turn),
            (Turn::Half, Turn::Half) | (Turn::Quarter, Turn::Prime) | (Turn::Prime, Turn::Quarter)
        )
    }
}

impl FromStr for Step {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Step, SearchError> {
        let invalid = || SearchError::InvalidStep(s.to_owned());

        let digits = s.bytes().take_while(|b| b.is_ascii_digit()).count();
        let explicit_rows = if digits > 0 {
            Some(s[..digits].parse::<u8>().map_err(|_| invalid())?)
        } else {
            None
        };

        let rest = &s[digits..];
        let face = rest.chars().next().filter(|c| c.is_ascii_alphabetic()).ok_or_else(invalid)?;
        let rest = &rest[1..];
        let wide = rest.starts_with('w');
        let suffix = if wide { &rest[1..] } else { rest };

        let turn = match suffix {
            "" => Turn::Quarter,
            "2" | "2'" => Turn::Half,
            "'" => Turn::Prime,
            _ => return Err(invalid()),
        };

        let rows = match explicit_rows {
            Some(0) => return Err(invalid()),
            Some(n) => n,
            None if wide => 2,
            None => 1,
        };

        Ok(Step {
            name: s.to_owned(),
            base_len: s.len() - suffix.len(),
            face,
            rows,
            wide,
            turn,
        })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub fn parse_steps<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Step>, SearchError> {
    tokens.iter().map(|t| t.as_ref().parse()).collect()
}

pub fn reverse_steps(steps: &[Step]) -> Vec<Step> {
    steps.iter().rev().map(Step::inverse).collect()
}

// drop adjacent pairs that undo each other
pub fn simplify(steps: &[Step]) -> Vec<Step> {
    let mut ret: Vec<Step> = vec![];
    for step in steps {
        if ret.last().map_or(false, |prev| step.cancels(prev)) {
            ret.pop();
        } else {
            ret.push(step.clone());
        }
    }
    ret
}

pub fn steps_to_string(steps: &[Step]) -> String {
    steps.iter().map(Step::name).collect::<Vec<_>>().join(" ")
}
