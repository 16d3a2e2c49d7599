//! Shell-local variables.

const PATH_NAME: &str = "PATH";

/// A single `name=value` binding owned by the [`VarTable`].
///
/// The name is immutable once the binding exists; reassignment replaces the
/// value in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    value: String,
}

impl Variable {
    /// Name of the binding.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value of the binding.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Ordered table of shell variables.
///
/// Entries keep their insertion order, with one exception: the `PATH`
/// binding, when present, always occupies the head of the table. The table
/// also tracks the PATH entry's index explicitly, so executable resolution
/// reads the tracked entry rather than trusting physical position.
///
/// The table is plain session state: it is created when a session starts,
/// passed by reference into parsing, and dropped with the session. It is
/// never shared between threads.
#[derive(Debug, Clone, Default)]
pub struct VarTable {
    vars: Vec<Variable>,
    path_idx: Option<usize>,
}

impl VarTable {
    /// An empty table. Nothing resolves until `PATH` is bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a variable by name. First match in table order wins.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|var| var.name == name)
            .map(|var| var.value.as_str())
    }

    /// Value of the tracked `PATH` binding, if one exists.
    pub fn path_value(&self) -> Option<&str> {
        self.path_idx.map(|idx| self.vars[idx].value.as_str())
    }

    /// Insert or update a binding.
    ///
    /// `PATH` is special-cased to uphold the head invariant: updating an
    /// existing `PATH` replaces its value in place, while binding `PATH`
    /// into a table that lacks it inserts the new entry ahead of everything
    /// else. Any other name updates the first entry with that name, or
    /// appends at the tail.
    pub fn upsert(&mut self, name: &str, value: &str) {
        if name == PATH_NAME {
            match self.path_idx {
                Some(idx) => self.vars[idx].value = value.to_string(),
                None => {
                    self.vars.insert(
                        0,
                        Variable {
                            name: name.to_string(),
                            value: value.to_string(),
                        },
                    );
                    self.path_idx = Some(0);
                }
            }
            return;
        }

        match self.vars.iter_mut().find(|var| var.name == name) {
            Some(var) => var.value = value.to_string(),
            None => self.vars.push(Variable {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.vars.iter()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// True when no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_lookup() {
        let mut table = VarTable::new();
        assert_eq!(table.lookup("KEY"), None);

        table.upsert("KEY", "VALUE");
        assert_eq!(table.lookup("KEY"), Some("VALUE"));
    }

    #[test]
    fn reassignment_replaces_value_in_place() {
        let mut table = VarTable::new();
        table.upsert("A", "1");
        table.upsert("B", "2");
        table.upsert("A", "3");

        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("A"), Some("3"));
        let names: Vec<&str> = table.iter().map(Variable::name).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn path_binding_moves_to_head() {
        let mut table = VarTable::new();
        table.upsert("HOME", "/home/me");
        table.upsert("EDITOR", "vi");
        table.upsert("PATH", "/bin:/usr/bin");

        let names: Vec<&str> = table.iter().map(Variable::name).collect();
        assert_eq!(names, ["PATH", "HOME", "EDITOR"]);
        assert_eq!(table.path_value(), Some("/bin:/usr/bin"));
    }

    #[test]
    fn path_update_mutates_head_in_place() {
        let mut table = VarTable::new();
        table.upsert("PATH", "/bin");
        table.upsert("HOME", "/home/me");
        table.upsert("PATH", "/usr/bin");

        assert_eq!(table.len(), 2);
        let head = table.iter().next().unwrap();
        assert_eq!(head.name(), "PATH");
        assert_eq!(head.value(), "/usr/bin");
        assert_eq!(table.path_value(), Some("/usr/bin"));
    }

    #[test]
    fn path_into_empty_table() {
        let mut table = VarTable::new();
        table.upsert("PATH", "/bin");

        assert_eq!(table.len(), 1);
        assert_eq!(table.iter().next().unwrap().name(), "PATH");
    }

    #[test]
    fn no_path_means_no_path_value() {
        let mut table = VarTable::new();
        table.upsert("HOME", "/home/me");
        assert_eq!(table.path_value(), None);
    }
}
