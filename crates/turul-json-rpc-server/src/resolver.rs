//! Overload resolution across a service's interfaces.

use thiserror::Error;
use tracing::trace;

use crate::binder::{self, Binding};
use crate::descriptor::MethodDescriptor;
use crate::request::RequestParams;

/// Why no single method could be chosen
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no method named '{0}'")]
    NotFound(String),

    #[error("{}", .reasons.join("; "))]
    NoMatchingSignature { method: String, reasons: Vec<String> },

    #[error("{candidates} overloads of '{method}' match equally well")]
    Ambiguous { method: String, candidates: usize },
}

/// The chosen candidate
#[derive(Debug)]
pub struct Resolved<'a, M> {
    /// Position of the declaring interface in the service's interface list
    pub interface: usize,
    /// Declaration position inside that interface
    pub position: usize,
    pub method: &'a M,
    pub binding: Binding,
}

/// Pick the method to call.
///
/// `interfaces` must be given in priority order. Candidates are ranked by
/// named arguments left unused, defaulted parameters, then coercion cost. A
/// tie between identical signatures goes to the first declaration; a tie
/// between different signatures is ambiguous.
pub fn resolve<'a, M, I>(
    interfaces: I,
    method_name: &str,
    params: Option<&RequestParams>,
) -> Result<Resolved<'a, M>, ResolveError>
where
    M: AsRef<MethodDescriptor> + 'a,
    I: IntoIterator<Item = &'a [M]>,
{
    let mut rejected: Vec<(String, String)> = Vec::new();
    let mut compatible: Vec<Resolved<'a, M>> = Vec::new();

    for (interface, methods) in interfaces.into_iter().enumerate() {
        for (position, method) in methods.iter().enumerate() {
            let descriptor = method.as_ref();
            if descriptor.name != method_name {
                continue;
            }
            match binder::bind(descriptor, params) {
                Ok(binding) => compatible.push(Resolved {
                    interface,
                    position,
                    method,
                    binding,
                }),
                Err(reason) => {
                    trace!("Candidate {} rejected: {}", descriptor, reason);
                    rejected.push((descriptor.to_string(), reason.to_string()));
                }
            }
        }
    }

    // Stable sort keeps interface order, then declaration order, within a rank.
    compatible.sort_by_key(|c| c.binding.rank());
    let mut ranked = compatible.into_iter();
    let Some(first) = ranked.next() else {
        if rejected.is_empty() {
            return Err(ResolveError::NotFound(method_name.to_string()));
        }
        let reasons = if rejected.len() == 1 {
            rejected.into_iter().map(|(_, reason)| reason).collect()
        } else {
            rejected
                .into_iter()
                .map(|(signature, reason)| format!("{}: {}", signature, reason))
                .collect()
        };
        return Err(ResolveError::NoMatchingSignature {
            method: method_name.to_string(),
            reasons,
        });
    };

    let rivals = ranked
        .take_while(|c| c.binding.rank() == first.binding.rank())
        .filter(|c| !c.method.as_ref().same_signature(first.method.as_ref()))
        .count();
    if rivals > 0 {
        return Err(ResolveError::Ambiguous {
            method: method_name.to_string(),
            candidates: rivals + 1,
        });
    }
    Ok(first)
}
