// build.rs

use chrono::Utc;

fn main() {
    // Stamp the binary with the build time, surfaced in the startup banner
    let build_date = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    println!("cargo:rustc-env=PICFRAME_BUILD_DATE={}", build_date);

    // Only re-run when the build script itself changes
    println!("cargo:rerun-if-changed=build.rs");
}
