fn main() {
    println!("cargo:rerun-if-changed=linker.ld");
    println!("cargo:rerun-if-env-changed=RAMOS_LINKER_SCRIPT");

    // only the bare-metal kernel image needs the custom layout;
    // host builds link the stub binary normally.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("none") {
        return;
    }
    let script = std::env::var("RAMOS_LINKER_SCRIPT").unwrap_or_else(|_| {
        let dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
        format!("{dir}/linker.ld")
    });
    println!("cargo:rustc-link-arg-bins=-T{script}");
}
