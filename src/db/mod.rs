//! Persistence module split across logical submodules. Every function takes
//! the connection explicitly; nothing in here holds global state.

mod actions;
mod bindings;
mod catalog;
mod connection;
mod defaults;
mod games;
mod seed;

#[cfg(test)]
pub(crate) mod fixtures;

pub use actions::{add_new_action, create_action, fetch_action, fetch_actions, update_action};
pub use bindings::{
    create_binding, delete_binding, fetch_binding, fetch_binding_view, fetch_bindings_for_game,
    fetch_category_bindings, fetch_game_layout, reorder_bindings, update_binding,
    SORT_ORDER_STEP,
};
pub use catalog::{
    create_category, create_game_key, create_modifier, fetch_categories, fetch_category,
    fetch_game_keys, fetch_modifiers, find_category_by_name, find_game_key_by_name,
    find_modifier_by_name,
};
pub use connection::{ensure_schema, open_in_memory, open_store};
pub use defaults::{
    compare_with_default, copy_default_bindings, default_binding_for_action,
    fetch_unbound_actions,
};
pub use games::{
    delete_game, fetch_default_game, fetch_game, fetch_games, find_game_by_name, upsert_game,
};
pub use seed::seed_defaults;
