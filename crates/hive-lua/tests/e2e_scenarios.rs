//! End-to-end scenarios driven through Lua, observed from Rust via
//! the channel registry.

mod common;

use common::{channel_at, drain, ensure_runtime, wait_for};
use hive_lua::HostEnv;
use hive_runtime::{Message, MsgValue, Pool};
use std::collections::BTreeSet;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(15);

fn host() -> mlua::Lua {
    ensure_runtime();
    HostEnv::new().create_lua().expect("host lua")
}

fn text(value: &MsgValue) -> &str {
    match value {
        MsgValue::Text(s) => s,
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn single_process_echo_preserves_order() {
    let lua = host();
    let out_addr: i64 = lua
        .load(
            r#"
            local out = hive.channel.new()
            local p = hive.process.new(function(ch, msg) ch:put(msg) end, nil, 1)
            p(out, "hello")
            p(out, "world")
            return out:ptr()
            "#,
        )
        .eval()
        .expect("script");

    let out = channel_at(out_addr);
    let got = drain(&out, 2, TIMEOUT);
    assert_eq!(got.len(), 2);
    assert_eq!(text(&got[0].values()[0]), "hello");
    assert_eq!(text(&got[1].values()[0]), "world");
}

#[test]
fn fanout_loses_order_but_nothing_else() {
    let lua = host();
    let out_addr: i64 = lua
        .load(
            r#"
            local out = hive.channel.new()
            local p = hive.process.new(function(ch, v) ch:put(v) end, nil, 4)
            for i = 0, 99 do
                p(out, i)
            end
            return out:ptr()
            "#,
        )
        .eval()
        .expect("script");

    let out = channel_at(out_addr);
    let got = drain(&out, 100, TIMEOUT);
    assert_eq!(got.len(), 100, "exactly 100 deliveries");

    let values: BTreeSet<i64> = got
        .iter()
        .map(|message| match message.values() {
            [MsgValue::Integer(v)] => *v,
            other => panic!("unexpected message {other:?}"),
        })
        .collect();
    let expected: BTreeSet<i64> = (0..100).collect();
    assert_eq!(values, expected, "set equality; ordering is not promised");
}

#[test]
fn pool_kill_drains_first() {
    let lua = host();
    let (out_addr, pool_addr): (i64, i64) = lua
        .load(
            r#"
            local q = hive.pool.new(2)
            local out = hive.channel.new()
            local p = hive.process.new(function(ch, v) ch:put(v) end, nil, 2)
            p:setpool(q)
            for i = 1, 1000 do
                p(out, i)
            end
            q:kill()
            q:kill()
            return out:ptr(), q:ptr()
            "#,
        )
        .eval()
        .expect("script");

    let out = channel_at(out_addr);
    let got = drain(&out, 1000, TIMEOUT);
    assert_eq!(got.len(), 1000, "every message processed before exit");

    let pool = Pool::get(pool_addr as usize).expect("pool registered");
    assert!(
        wait_for(|| pool.live() == 0, TIMEOUT),
        "both workers exited once idle"
    );
    assert_eq!(pool.size(), 2, "reported size keeps the original intent");
}

#[test]
fn nested_process_discovers_parent() {
    let lua = host();
    let out_addr: i64 = lua
        .load(
            r#"
            local out = hive.channel.new()
            local outer = hive.process.new(function(ch, outer_ptr)
                local inner = hive.process.new(function() end)
                local parent = inner:parent()
                ch:put(parent ~= nil and parent:ptr() == outer_ptr)
            end, nil, 1)
            outer(out, outer:ptr())
            return out:ptr()
            "#,
        )
        .eval()
        .expect("script");

    let out = channel_at(out_addr);
    let got = drain(&out, 1, TIMEOUT);
    assert_eq!(
        got[0].values(),
        &[MsgValue::Bool(true)],
        "inner:parent() is the outer process"
    );
}

#[test]
fn error_handler_runs_once_then_instance_dies() {
    let lua = host();
    let (out_addr, proc_addr): (i64, i64) = lua
        .load(
            r#"
            local out = hive.channel.new()
            -- The handler cannot capture upvalues (environments travel
            -- as dumped chunks), so the channel address is baked in.
            local handler = assert(load(
                "local e = ... " ..
                "local ch = assert(hive.channel.get(" .. out:ptr() .. ")) " ..
                "ch:put('caught:' .. tostring(e))"
            ))
            local p = hive.process.new(function() error("boom") end, handler, 1)
            p("x")
            return out:ptr(), p:ptr()
            "#,
        )
        .eval()
        .expect("script");

    let out = channel_at(out_addr);
    let got = drain(&out, 1, TIMEOUT);
    let caught = text(&got[0].values()[0]);
    assert!(caught.starts_with("caught:"), "got: {caught}");
    assert!(caught.contains("boom"), "got: {caught}");

    let process = hive_runtime::Process::get(proc_addr as usize).expect("process");
    assert!(
        wait_for(|| process.size() == 0, TIMEOUT),
        "faulted instance drained from the count"
    );
}

#[test]
fn hive_get_parks_on_an_explicit_channel() {
    let lua = host();
    let (out_addr, side_addr): (i64, i64) = lua
        .load(
            r#"
            local out = hive.channel.new()
            local side = hive.channel.new()
            -- The side channel travels inside the message; the handler
            -- then blocks on it rather than on the process input.
            local p = hive.process.new(function(ch, watched)
                local v = hive.get(watched)
                ch:put("got:" .. v)
            end, nil, 1)
            p(out, side)
            return out:ptr(), side:ptr()
            "#,
        )
        .eval()
        .expect("script");

    let side = channel_at(side_addr);
    assert!(
        wait_for(|| side.waiter_count() == 1, TIMEOUT),
        "instance parked on the yielded channel, not the input"
    );

    side.push(Message::single("ping")).expect("side push");
    let out = channel_at(out_addr);
    let got = drain(&out, 1, TIMEOUT);
    assert_eq!(text(&got[0].values()[0]), "got:ping");
    assert_eq!(side.waiter_count(), 0, "waiter consumed by the delivery");
}

#[test]
fn hive_yield_requeues_and_resumes_without_a_message() {
    let lua = host();
    let out_addr: i64 = lua
        .load(
            r#"
            local out = hive.channel.new()
            local p = hive.process.new(function(ch)
                ch:put("before")
                local woke = hive.yield()
                ch:put("after", woke == nil)
            end, nil, 1)
            p(out)
            return out:ptr()
            "#,
        )
        .eval()
        .expect("script");

    let out = channel_at(out_addr);
    let got = drain(&out, 2, TIMEOUT);
    assert_eq!(text(&got[0].values()[0]), "before");
    assert_eq!(text(&got[1].values()[0]), "after");
    assert_eq!(
        got[1].values()[1],
        MsgValue::Bool(true),
        "the wake-up after a voluntary yield delivers no message"
    );
}

#[test]
fn ptr_roundtrip_yields_the_same_pool() {
    let lua = host();
    let ok: bool = lua
        .load(
            r#"
            local a = hive.pool.new(1)
            local b = assert(hive.pool.get(a:ptr()))
            assert(a == b, "identity equality through the registry")
            b:add(1)
            return a:size() == 2
            "#,
        )
        .eval()
        .expect("script");
    assert!(ok, "operations through either handle hit the same pool");
}
