//! Register names for the host architecture

/// Architecture the helper is compiled for
pub fn current() -> &'static str {
    std::env::consts::ARCH
}

/// A general purpose register every supported architecture exposes
pub fn general_purpose_register(arch: &str) -> Option<&'static str> {
    match arch {
        "x86_64" => Some("rax"),
        "x86" => Some("eax"),
        "aarch64" => Some("x0"),
        "arm" => Some("r0"),
        _ => None,
    }
}

/// The frame pointer register
pub fn frame_pointer_register(arch: &str) -> Option<&'static str> {
    match arch {
        "x86_64" => Some("rbp"),
        "x86" => Some("ebp"),
        "aarch64" => Some("fp"),
        "arm" => Some("r11"),
        _ => None,
    }
}
