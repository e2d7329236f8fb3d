fn main() {
   tauri_plugin::Builder::new(&["execute", "query", "status"]).build();
}
