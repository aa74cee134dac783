use serde::Serialize;
use std::fmt;
use std::mem;

/// The parts of a target ABI that decide where struct fields land.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Target {
    pub name: &'static str,
    /// At most `MAX_POINTER_SIZE`; definitions are size-checked against it.
    pub pointer_size: u32,
    /// Largest alignment a scalar gets inside a struct. i386 System V puts
    /// `double` and `long long` on 4-byte boundaries, so this is 4 there.
    pub max_scalar_align: u32,
}

impl Target {
    pub const MAX_POINTER_SIZE: u32 = 8;

    pub const X86_64: Target = Target {
        name: "x86_64",
        pointer_size: 8,
        max_scalar_align: 8,
    };

    pub const I686: Target = Target {
        name: "i686",
        pointer_size: 4,
        max_scalar_align: 4,
    };

    // 32-bit AAPCS keeps 8-byte alignment for 8-byte scalars.
    pub const ARM: Target = Target {
        name: "arm",
        pointer_size: 4,
        max_scalar_align: 8,
    };

    pub const ALL: [Target; 3] = [Target::X86_64, Target::I686, Target::ARM];

    pub fn from_name(name: &str) -> Option<Target> {
        Target::ALL.iter().copied().find(|t| t.name == name)
    }

    /// The target this binary was built for, as far as struct layout goes.
    /// Sizes and alignments come from the compiler itself; the name is the
    /// build's architecture, spelled like the presets where one exists.
    pub fn host() -> Target {
        let name = match std::env::consts::ARCH {
            "x86" => "i686",
            arch => arch,
        };

        Target {
            name,
            pointer_size: mem::size_of::<usize>() as u32,
            max_scalar_align: mem::align_of::<u64>().max(mem::align_of::<f64>()) as u32,
        }
    }

    pub fn is_host(&self) -> bool {
        *self == Target::host()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_found_by_name() {
        assert_eq!(Target::from_name("x86_64"), Some(Target::X86_64));
        assert_eq!(Target::from_name("i686"), Some(Target::I686));
        assert_eq!(Target::from_name("arm"), Some(Target::ARM));
        assert_eq!(Target::from_name("sparc"), None);
    }

    #[test]
    fn host_matches_the_compiler() {
        let host = Target::host();

        assert_eq!(host.pointer_size as usize, std::mem::size_of::<usize>());
        assert_eq!(host.max_scalar_align as usize, std::mem::align_of::<u64>());
        assert!(host.is_host());
        assert!(host.pointer_size <= Target::MAX_POINTER_SIZE);
    }

    #[test]
    fn same_numbers_under_another_name_are_not_the_host() {
        let host = Target::host();
        let renamed = Target {
            name: if host.name == "x86_64" { "aarch64" } else { "x86_64" },
            ..host
        };

        assert!(!renamed.is_host());
        assert!(Target::ALL
            .iter()
            .all(|t| t.pointer_size <= Target::MAX_POINTER_SIZE));
    }
}
