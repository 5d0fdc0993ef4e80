//! Small store used by the unit tests: two categories, a handful of keys,
//! the default game with four baseline bindings and one empty user game.

use rusqlite::Connection;

use super::{
    create_action, create_binding, create_category, create_game_key, create_modifier,
    open_in_memory, upsert_game,
};

pub(crate) struct Fixture {
    pub(crate) conn: Connection,
    pub(crate) default_id: i64,
    pub(crate) game_id: i64,
    pub(crate) movement: i64,
    pub(crate) combat: i64,
    pub(crate) forward: i64,
    pub(crate) backward: i64,
    pub(crate) jump: i64,
    pub(crate) fire: i64,
    pub(crate) key_w: i64,
    pub(crate) key_s: i64,
    pub(crate) key_space: i64,
    pub(crate) key_mouse1: i64,
    pub(crate) key_ctrl: i64,
    pub(crate) tap: i64,
    pub(crate) hold: i64,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let conn = open_in_memory().unwrap();

        let movement = create_category(&conn, "movement", "").unwrap().id;
        let combat = create_category(&conn, "combat", "").unwrap().id;

        let key_w = create_game_key(&conn, "W").unwrap().id;
        let key_s = create_game_key(&conn, "S").unwrap().id;
        let key_space = create_game_key(&conn, "Space").unwrap().id;
        let key_mouse1 = create_game_key(&conn, "Mouse1").unwrap().id;
        let key_ctrl = create_game_key(&conn, "Ctrl").unwrap().id;

        let tap = create_modifier(&conn, "tap").unwrap().id;
        let hold = create_modifier(&conn, "hold").unwrap().id;

        let default_id = upsert_game(&conn, "default", "tactical", None).unwrap().id;
        let game_id = upsert_game(&conn, "apex", "dumb", None).unwrap().id;

        let forward = create_action(&conn, "forward", "", movement).unwrap().id;
        let backward = create_action(&conn, "backward", "", movement).unwrap().id;
        let jump = create_action(&conn, "jump", "", movement).unwrap().id;
        let fire = create_action(&conn, "fire", "", combat).unwrap().id;

        for (action, key) in [
            (forward, key_w),
            (backward, key_s),
            (jump, key_space),
            (fire, key_mouse1),
        ] {
            create_binding(&conn, default_id, action, Some(key), tap, "").unwrap();
        }

        Self {
            conn,
            default_id,
            game_id,
            movement,
            combat,
            forward,
            backward,
            jump,
            fire,
            key_w,
            key_s,
            key_space,
            key_mouse1,
            key_ctrl,
            tap,
            hold,
        }
    }

    pub(crate) fn binding_count(&self) -> i64 {
        self.conn
            .query_row("SELECT COUNT(*) FROM bindings", [], |row| row.get(0))
            .unwrap()
    }
}
