mod common;

use std::str::FromStr;

use common::{bar, day, setup_db};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use kline_sync::models::SymbolRef;
use kline_sync::schema::{kline_bar, stock_symbol};
use kline_sync::store::{KlineRepo, SaveBarsOptions, SqliteKlineRepo};
use quote_ingestor::models::symbol::SymbolRecord;
use rust_decimal::Decimal;

fn pf_bank() -> SymbolRef {
    SymbolRef::new("SH600000", "PF Bank")
}

fn opts(upsert: bool, batch_size: usize) -> SaveBarsOptions {
    SaveBarsOptions { upsert, batch_size }
}

fn stored_close(conn: &mut SqliteConnection, code: &str, ts: i64) -> Option<String> {
    kline_bar::table
        .filter(kline_bar::symbol_code.eq(code))
        .filter(kline_bar::timestamp.eq(ts))
        .select(kline_bar::close)
        .first::<Option<String>>(conn)
        .unwrap()
}

#[test]
fn symbols_are_replaced_as_whole_rows() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteKlineRepo::new();

    let mut first = SymbolRecord::new("SH600000", "Old Name");
    first.pe_ttm = Some(Decimal::from_str("5.12").unwrap());
    first.followers = 10;
    assert_eq!(repo.save_symbols(&mut conn, &[first]).unwrap(), 1);

    let second = SymbolRecord::new("SH600000", "New Name");
    repo.save_symbols(&mut conn, &[second, SymbolRecord::new("BJ430047", "Nuode")])
        .unwrap();

    let listed = repo.list_symbols(&mut conn).unwrap();
    assert_eq!(
        listed,
        vec![
            SymbolRef::new("BJ430047", "Nuode"),
            SymbolRef::new("SH600000", "New Name"),
        ]
    );

    let (pe, followers): (Option<String>, i64) = stock_symbol::table
        .filter(stock_symbol::code.eq("SH600000"))
        .select((stock_symbol::pe_ttm, stock_symbol::followers))
        .first(&mut conn)
        .unwrap();
    assert_eq!(pe, None, "absent attributes overwrite stored ones");
    assert_eq!(followers, 0);
}

#[test]
fn failing_symbol_batch_keeps_nothing() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteKlineRepo::new();
    conn.batch_execute(
        "CREATE TRIGGER reject_bad BEFORE INSERT ON stock_symbol \
         WHEN NEW.code = 'BAD' BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
    )
    .unwrap();

    let batch = [
        SymbolRecord::new("SH600000", "PF Bank"),
        SymbolRecord::new("BAD", "Broken"),
    ];
    assert!(repo.save_symbols(&mut conn, &batch).is_err());
    assert!(repo.list_symbols(&mut conn).unwrap().is_empty());
}

#[test]
fn existing_bars_are_skipped_without_upsert() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteKlineRepo::new();
    let sym = pf_bank();

    let n = repo
        .save_bars(&mut conn, &[bar(day(0), "10.0"), bar(day(1), "11.0")], &sym, opts(false, 500))
        .unwrap();
    assert_eq!(n, 2);

    let n = repo
        .save_bars(&mut conn, &[bar(day(1), "99.0"), bar(day(2), "12.0")], &sym, opts(false, 500))
        .unwrap();
    assert_eq!(n, 1);
    assert_eq!(repo.bar_count(&mut conn, "SH600000").unwrap(), 3);
    assert_eq!(stored_close(&mut conn, "SH600000", day(1)).as_deref(), Some("11"));
}

#[test]
fn upsert_overwrites_existing_bars() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteKlineRepo::new();
    let sym = pf_bank();

    repo.save_bars(&mut conn, &[bar(day(0), "10.0")], &sym, opts(false, 500))
        .unwrap();
    let n = repo
        .save_bars(&mut conn, &[bar(day(0), "10.25"), bar(day(1), "11.0")], &sym, opts(true, 500))
        .unwrap();
    assert_eq!(n, 2);
    assert_eq!(repo.bar_count(&mut conn, "SH600000").unwrap(), 2);
    assert_eq!(stored_close(&mut conn, "SH600000", day(0)).as_deref(), Some("10.25"));
}

#[test]
fn duplicate_timestamps_in_one_call_insert_once() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteKlineRepo::new();
    let sym = pf_bank();

    let n = repo
        .save_bars(&mut conn, &[bar(day(0), "1.0"), bar(day(0), "2.0")], &sym, opts(false, 500))
        .unwrap();
    assert_eq!(n, 1);
    assert_eq!(stored_close(&mut conn, "SH600000", day(0)).as_deref(), Some("1"));

    // With upsert the repeat overwrites the row written moments earlier.
    let n = repo
        .save_bars(&mut conn, &[bar(day(5), "1.0"), bar(day(5), "2.0")], &sym, opts(true, 500))
        .unwrap();
    assert_eq!(n, 2);
    assert_eq!(repo.bar_count(&mut conn, "SH600000").unwrap(), 2);
    assert_eq!(stored_close(&mut conn, "SH600000", day(5)).as_deref(), Some("2"));
}

#[test]
fn small_batches_commit_everything() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteKlineRepo::new();
    let bars: Vec<_> = (0..7).map(|d| bar(day(d), "3.0")).collect();

    let n = repo
        .save_bars(&mut conn, &bars, &pf_bank(), opts(false, 2))
        .unwrap();
    assert_eq!(n, 7);
    assert_eq!(repo.bar_count(&mut conn, "SH600000").unwrap(), 7);

    let stored = repo.load_bars(&mut conn, "SH600000").unwrap();
    assert_eq!(stored.first().map(|b| b.timestamp), Some(day(6)));
    assert_eq!(stored.last().map(|b| b.timestamp), Some(day(0)));
    assert_eq!(stored[0].trade_date, "2024-01-07");
    assert_eq!(stored[0].close, Some(Decimal::from_str("3").unwrap()));
}

#[test]
fn failure_keeps_segments_committed_before_it() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteKlineRepo::new();
    let bars = vec![
        bar(day(0), "1.0"),
        bar(day(1), "1.0"),
        bar(day(2), "1.0"),
        // Outside the representable calendar; its row cannot be built.
        bar(i64::MAX, "1.0"),
    ];

    let err = repo
        .save_bars(&mut conn, &bars, &pf_bank(), opts(false, 2))
        .unwrap_err();
    assert_eq!(err.committed, 2);
    assert_eq!(repo.bar_count(&mut conn, "SH600000").unwrap(), 2);
    assert_eq!(
        repo.last_bar_timestamp(&mut conn, "SH600000").unwrap(),
        Some(day(1))
    );
}

#[test]
fn sync_state_is_per_symbol() {
    let (_db, mut conn) = setup_db();
    let repo = SqliteKlineRepo::new();
    assert_eq!(repo.last_bar_timestamp(&mut conn, "SH600000").unwrap(), None);

    repo.save_bars(&mut conn, &[bar(day(3), "1.0")], &pf_bank(), opts(false, 500))
        .unwrap();
    assert_eq!(
        repo.last_bar_timestamp(&mut conn, "SH600000").unwrap(),
        Some(day(3))
    );
    assert_eq!(repo.last_bar_timestamp(&mut conn, "SZ000001").unwrap(), None);
}
