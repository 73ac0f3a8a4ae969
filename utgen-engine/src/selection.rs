//! Method selection

use serde::{Deserialize, Serialize};
use std::fmt;
use utgen_core::{MethodDecl, MethodSignature, Type};
use utgen_harvest::sample;

/// One method of the class under test and whether it was picked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodUnderTest {
    class: String,
    ordinal: usize,
    signature: MethodSignature,
    return_type: Type,
    is_static: bool,
    selected: bool,
}

impl MethodUnderTest {
    pub fn new(class: &str, ordinal: usize, method: &MethodDecl) -> Self {
        Self {
            class: class.to_string(),
            ordinal,
            signature: method.signature(),
            return_type: method.return_type.clone(),
            is_static: method.is_static(),
            selected: false,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub fn params(&self) -> &[Type] {
        &self.signature.params
    }

    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn toggle(&mut self) {
        self.selected = !self.selected;
    }

    /// Parameter types the harvester has no sample strategy for
    pub fn unsupported_params(&self) -> Vec<&Type> {
        self.signature
            .params
            .iter()
            .filter(|ty| !sample::supports(ty))
            .collect()
    }

    pub fn is_synthesizable(&self) -> bool {
        self.unsupported_params().is_empty()
    }
}

impl fmt::Display for MethodUnderTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class, self.signature)
    }
}

/// Select every method whose name or full signature is listed
///
/// With an empty list every method is selected. Returns the entries that
/// matched nothing.
pub fn select_named<'n>(methods: &mut [MethodUnderTest], names: &'n [String]) -> Vec<&'n str> {
    if names.is_empty() {
        methods.iter_mut().for_each(|m| m.set_selected(true));
        return Vec::new();
    }
    let mut unmatched = Vec::new();
    for name in names {
        let mut matched = false;
        for method in methods.iter_mut() {
            if method.name() == name || method.signature.to_string() == *name {
                method.set_selected(true);
                matched = true;
            }
        }
        if !matched {
            unmatched.push(name.as_str());
        }
    }
    unmatched
}
