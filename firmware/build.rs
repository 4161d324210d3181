use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let Some(out_dir) = env::var_os("OUT_DIR") else {
        panic!("OUT_DIR not set by cargo");
    };
    let out = PathBuf::from(out_dir);

    // Put memory.x where the linker finds it
    if let Err(e) = fs::write(out.join("memory.x"), include_bytes!("memory-rp2040.x")) {
        panic!("cannot write memory.x: {}", e);
    }

    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory-rp2040.x");
    println!("cargo:rerun-if-changed=build.rs");

    // Linker arguments
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
