pub mod analyze;
pub mod batch;
pub mod config;
pub mod generator;
pub mod generators;
pub mod logging;
pub mod models;
pub mod prerequisites;
pub mod presets;

/// Get an extended PATH that includes common Python tool installation directories.
/// The generator scripts usually live in a virtualenv or conda env that the
/// calling shell may not have activated, so add the usual places explicitly.
#[cfg(target_os = "windows")]
pub fn get_extended_path() -> String {
    let home = std::env::var("USERPROFILE").unwrap_or_default();
    let appdata = std::env::var("APPDATA").unwrap_or_default();
    let virtual_env = std::env::var("VIRTUAL_ENV").unwrap_or_default();
    let conda_prefix = std::env::var("CONDA_PREFIX").unwrap_or_default();
    let current_path = std::env::var("PATH").unwrap_or_default();

    let mut extra_paths = vec![
        format!("{}\\miniconda3\\Scripts", home),
        format!("{}\\anaconda3\\Scripts", home),
        format!("{}\\.local\\bin", home),
    ];

    if !virtual_env.is_empty() {
        extra_paths.insert(0, format!("{}\\Scripts", virtual_env));
    }

    if !conda_prefix.is_empty() {
        extra_paths.insert(0, format!("{}\\Scripts", conda_prefix));
    }

    if !appdata.is_empty() {
        extra_paths.push(format!("{}\\Python\\Scripts", appdata));
    }

    format!("{};{}", extra_paths.join(";"), current_path)
}

#[cfg(not(target_os = "windows"))]
pub fn get_extended_path() -> String {
    let home = std::env::var("HOME").unwrap_or_default();
    let virtual_env = std::env::var("VIRTUAL_ENV").unwrap_or_default();
    let conda_prefix = std::env::var("CONDA_PREFIX").unwrap_or_default();
    let current_path = std::env::var("PATH").unwrap_or_default();

    let mut extra_paths = Vec::new();

    // An activated environment wins over everything else
    if !virtual_env.is_empty() {
        extra_paths.push(format!("{}/bin", virtual_env));
    }
    if !conda_prefix.is_empty() {
        extra_paths.push(format!("{}/bin", conda_prefix));
    }

    extra_paths.extend([
        format!("{}/.local/bin", home),      // pip install --user
        format!("{}/.pyenv/shims", home),    // pyenv
        format!("{}/miniconda3/bin", home),  // conda (user install)
        format!("{}/anaconda3/bin", home),
        "/opt/conda/bin".to_string(),        // conda (docker images)
        "/opt/homebrew/bin".to_string(),     // Homebrew (Apple Silicon)
        "/usr/local/bin".to_string(),
        "/usr/bin".to_string(),
        "/bin".to_string(),
    ]);

    format!("{}:{}", extra_paths.join(":"), current_path)
}
