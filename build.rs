use std::env;

fn main() {
    println!("cargo:rerun-if-changed=virt.ld");

    let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    // The linker script only applies to the bare-metal kernel build; host
    // builds of the workspace (for the library tests) link normally.
    if target_arch == "riscv64" && target_os == "none" {
        let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
        println!("cargo:rustc-link-arg=-T{manifest_dir}/virt.ld");
    }
}
