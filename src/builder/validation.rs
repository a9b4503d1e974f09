//! Declaration checks using Validation.
//!
//! Every check runs; all problems of a declaration are reported together.

use super::error::DeclarationError;
use super::state::StateBuilder;
use crate::core::Environment;
use crate::resolve::STATE_PARAMS;
use std::collections::BTreeSet;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<DeclarationError>>;

/// Validate `builder`, given a lookup of already registered names.
pub fn validate<Env, F>(builder: &StateBuilder<Env>, is_registered: F) -> Check
where
    Env: Environment,
    F: Fn(&str) -> bool,
{
    let mut checks: Vec<Check> = vec![
        name_present(builder.name()),
        not_registered(builder.name(), is_registered),
    ];
    checks.extend(duplicates(
        builder.params.iter().map(|p| p.id.as_str()),
        |id| DeclarationError::DuplicateParam { id },
    ));
    checks.extend(duplicates(
        builder.resolves.iter().map(|r| r.name()),
        |name| DeclarationError::DuplicateResolve { name },
    ));
    for resolve in &builder.resolves {
        checks.push(if resolve.name().is_empty() {
            Validation::fail(DeclarationError::EmptyResolveName)
        } else {
            Validation::success(())
        });
        checks.push(if resolve.name() == STATE_PARAMS {
            Validation::fail(DeclarationError::ReservedResolve {
                name: STATE_PARAMS.to_string(),
            })
        } else {
            Validation::success(())
        });
    }

    Validation::all_vec(checks).map(|_| ())
}

fn name_present(name: &str) -> Check {
    if name.trim().is_empty() || name.split('.').any(str::is_empty) {
        Validation::fail(DeclarationError::EmptyName)
    } else {
        Validation::success(())
    }
}

fn not_registered<F: Fn(&str) -> bool>(name: &str, is_registered: F) -> Check {
    if is_registered(name) {
        Validation::fail(DeclarationError::DuplicateState {
            name: name.to_string(),
        })
    } else {
        Validation::success(())
    }
}

fn duplicates<'a, I, E>(names: I, error: E) -> Vec<Check>
where
    I: Iterator<Item = &'a str>,
    E: Fn(String) -> DeclarationError,
{
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    names
        .filter(|name| !seen.insert(*name) && reported.insert(*name))
        .map(|name| Validation::fail(error(name.to_string())))
        .collect()
}
