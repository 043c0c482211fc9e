//! Boundary behaviors of the `hive.*` module surface.

mod common;

use common::ensure_runtime;
use hive_lua::HostEnv;
use mlua::Lua;

fn host() -> Lua {
    ensure_runtime();
    HostEnv::new().create_lua().expect("host lua")
}

fn eval_bool(lua: &Lua, script: &str) -> bool {
    lua.load(script).eval().expect("script")
}

#[test]
fn pool_new_zero_succeeds() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        "local q = hive.pool.new(0) return q:size() == 0"
    ));
}

#[test]
fn pool_new_negative_fails() {
    let lua = host();
    let err = lua
        .load("hive.pool.new(-1)")
        .exec()
        .expect_err("negative size");
    assert!(
        err.to_string().contains("Initial pool size"),
        "got: {err}"
    );
}

#[test]
fn pool_add_negative_fails() {
    let lua = host();
    let err = lua
        .load("hive.pool.new(0):add(-2)")
        .exec()
        .expect_err("negative add");
    assert!(
        err.to_string().contains("positive or zero"),
        "got: {err}"
    );
}

#[test]
fn pool_get_nil_address() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        r#"
        local p, err = hive.pool.get(0)
        return p == nil and err == "Pool is null"
        "#
    ));
}

#[test]
fn empty_process_cannot_spawn() {
    let lua = host();
    let err = lua
        .load("hive.process.new():spawn(1)")
        .exec()
        .expect_err("no environment");
    assert!(
        err.to_string().contains("environment"),
        "got: {err}"
    );
}

#[test]
fn wrap_completes_an_empty_process() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        r#"
        local p = hive.process.new()
        p:wrap(function() end)
        return p:size() == 1
        "#
    ));
}

#[test]
fn wrap_twice_fails() {
    let lua = host();
    let err = lua
        .load(
            r#"
            local p = hive.process.new()
            p:wrap(function() end)
            p:wrap(function() end)
            "#,
        )
        .exec()
        .expect_err("second wrap");
    assert!(
        err.to_string().contains("already has an environment"),
        "got: {err}"
    );
}

#[test]
fn remove_clamps_at_zero() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        r#"
        local p = hive.process.new(function() end, nil, 2)
        p:remove(10)
        return p:size() == 0
        "#
    ));
}

#[test]
fn get_after_destroy_reports_not_found() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        r#"
        local p = hive.process.new()
        local addr = p:ptr()
        hive.process.destroy(p)
        local found, err = hive.process.get(addr)
        return found == nil and err == "Process not found"
        "#
    ));
}

#[test]
fn destroy_rejected_with_live_instances() {
    let lua = host();
    let err = lua
        .load(
            r#"
            local p = hive.process.new(function() end, nil, 1)
            hive.process.destroy(p)
            "#,
        )
        .exec()
        .expect_err("live instances");
    assert!(err.to_string().contains("live instance"), "got: {err}");
}

#[test]
fn isprocess_distinguishes_types() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        r#"
        local p = hive.process.new()
        local q = hive.pool.new(0)
        return hive.process.isprocess(p)
            and not hive.process.isprocess(q)
            and not hive.process.isprocess(42)
            and not hive.process.isprocess(nil)
        "#
    ));
}

#[test]
fn process_get_returns_same_handle() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        r#"
        local p = hive.process.new()
        local again = assert(hive.process.get(p:ptr()))
        return p == again
        "#
    ));
}

#[test]
fn process_tostring_format() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        r#"
        local p = hive.process.new()
        return tostring(p):find("^Process %(0x") ~= nil
        "#
    ));
}

#[test]
fn pool_arity_overload() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        r#"
        local p = hive.process.new()
        local q = hive.pool.new(0)
        p:pool(q)
        return p:pool() == q
        "#
    ));
}

#[test]
fn pool_too_many_arguments() {
    let lua = host();
    let err = lua
        .load(
            r#"
            local p = hive.process.new()
            local q = hive.pool.new(0)
            p:pool(q, q)
            "#,
        )
        .exec()
        .expect_err("arity");
    assert!(err.to_string().contains("too many arguments"), "got: {err}");
}

#[test]
fn setinput_replaces_the_shared_channel() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        r#"
        local p = hive.process.new()
        local ch = hive.channel.new()
        p:setinput(ch)
        return p:input() == ch
        "#
    ));
}

#[test]
fn bounded_channel_reports_full() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        r#"
        local ch = hive.channel.new(1)
        assert(ch:put("first"))
        local ok, err = ch:put("second")
        return ok == nil and err == "Channel is full"
        "#
    ));
}

#[test]
fn channel_try_get_roundtrip() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        r#"
        local ch = hive.channel.new()
        ch:put("a", 1, true)
        local x, n, b = ch:try_get()
        return x == "a" and n == 1 and b == true and ch:try_get() == nil
        "#
    ));
}

#[test]
fn channel_capacity_surface() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        r#"
        local ch = hive.channel.new()
        assert(ch:capacity() == -1)
        ch:set_capacity(8)
        return ch:capacity() == 8
        "#
    ));
}

#[test]
fn env_returns_a_callable_copy() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        r#"
        local p = hive.process.new(function() end, nil, 0)
        local f = p:env()
        return type(f) == "function"
        "#
    ));
}

#[test]
fn empty_process_env_is_nil() {
    let lua = host();
    assert!(eval_bool(
        &lua,
        "return hive.process.new():env() == nil"
    ));
}
