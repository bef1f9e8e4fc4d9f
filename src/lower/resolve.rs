//! State-name resolution for references rewritten during lowering.

/// Maps a symbolic state reference to the name used in compiled output.
///
/// Every `Next`, `Default`, catcher target and `StartAt` passes through here,
/// so renaming or namespacing schemes only need a new implementation.
pub trait NameResolver {
    fn resolve(&self, name: &str) -> String;
}

/// Compiled names are source names.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl NameResolver for Identity {
    fn resolve(&self, name: &str) -> String {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_keeps_names() {
        assert_eq!(Identity.resolve("Step_1"), "Step_1");
    }
}
