//! Build-configuration fixtures for common test scenarios.

use crate::core::{
    BuildFacts, CompilerFamily, LibcFact, LibcFamily, StdLibFamily, Version,
};
use crate::resolver::rules::{ASAN_FEATURE, ASAN_MACRO, ATTR_NO_SANITIZE_ADDRESS};

fn linux(family: CompilerFamily, version: Version, glibc: Version) -> BuildFacts {
    let mut facts = BuildFacts::for_compiler(family, version);
    facts.stdlib = StdLibFamily::Libstdcxx;
    facts.libc = Some(LibcFact {
        family: LibcFamily::Glibc,
        version: glibc,
    });
    facts.features.headers.insert("sched.h".into());
    facts.features.headers.insert("features.h".into());
    facts
}

/// A current gcc on a current glibc.
pub fn modern_gcc() -> BuildFacts {
    linux(CompilerFamily::Gcc, Version::new(9, 3), Version::new(2, 31))
}

/// A gcc that predates `final`/`override` on a glibc without `preadv`.
pub fn legacy_gcc() -> BuildFacts {
    linux(CompilerFamily::Gcc, Version::new(4, 6), Version::new(2, 5))
}

/// gcc building with `-fsanitize=address`.
pub fn sanitized_gcc() -> BuildFacts {
    let mut facts = linux(CompilerFamily::Gcc, Version::new(4, 9), Version::new(2, 17));
    facts.features.predefined.insert(ASAN_MACRO.into());
    facts
}

/// clang building with `-fsanitize=address`.
pub fn sanitized_clang() -> BuildFacts {
    let mut facts = linux(CompilerFamily::Clang, Version::new(15, 0), Version::new(2, 31));
    facts.features.compiler_features.insert(ASAN_FEATURE.into());
    facts.features.attributes.insert(ATTR_NO_SANITIZE_ADDRESS.into());
    facts
}

/// clang with libc++ and no known C library.
pub fn libcxx_clang() -> BuildFacts {
    let mut facts = BuildFacts::for_compiler(CompilerFamily::Clang, Version::new(16, 0));
    facts.stdlib = StdLibFamily::Libcxx;
    facts.features.headers.insert("sched.h".into());
    facts
}

/// Preprocessor dump of a gcc 9.3 probe on glibc 2.31.
pub const GCC_MACRO_DUMP: &str = "\
#define __GNUC__ 9
#define __GNUC_MINOR__ 3
#define __GNUC_PATCHLEVEL__ 0
#define __cplusplus 201402L
#define __GLIBCXX__ 20200808
#define __GLIBC__ 2
#define __GLIBC_MINOR__ 31
#define __x86_64__ 1
#define PORTCFG_PROBE_HEADER_sched_h 1
#define PORTCFG_PROBE_HEADER_features_h 1
";

/// Preprocessor dump of an instrumented clang 15 probe using libc++.
pub const CLANG_ASAN_MACRO_DUMP: &str = "\
#define __GNUC__ 4
#define __GNUC_MINOR__ 2
#define __clang__ 1
#define __clang_major__ 15
#define __clang_minor__ 0
#define __clang_patchlevel__ 7
#define _LIBCPP_VERSION 15007
#define __GLIBC__ 2
#define __GLIBC_MINOR__ 35
#define PORTCFG_PROBE_HEADER_sched_h 1
#define PORTCFG_PROBE_FEATURE_address_sanitizer 1
#define PORTCFG_PROBE_ATTRIBUTE___no_sanitize_address__ 1
#define PORTCFG_PROBE_ATTRIBUTE___no_address_safety_analysis__ 1
";
