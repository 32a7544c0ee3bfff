const COMMANDS: &[&str] = &[
    "is_play_store_available",
    "check_for_update",
    "complete_update",
    "get_update_status",
];

fn main() {
    tauri_plugin::Builder::new(COMMANDS).build();
}
