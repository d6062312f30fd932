fn main() {
    let mut features = vec!["base".to_string()];
    if cfg!(feature = "pdf") {
        features.push("pdf".to_string());
    }
    if cfg!(feature = "spreadsheet") {
        features.push("spreadsheet".to_string());
    }
    println!("cargo:rustc-env=FINQA_FEATURES={}", features.join(", "));
}
