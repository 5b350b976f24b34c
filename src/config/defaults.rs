pub fn heading() -> String {
    "Generated Tarballs".to_string()
}

pub fn releases_dir() -> String {
    "Download/Releases".to_string()
}

pub fn generated_dir() -> String {
    "Download/Generated".to_string()
}

pub fn template_dir() -> String {
    "templates".to_string()
}

pub fn port() -> u16 {
    8080
}
