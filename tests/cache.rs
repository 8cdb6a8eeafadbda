use lineio::testing::{CountingProducer, PEOPLE_CSV, Person, TempDirPath, sample_people};
use lineio::{
    CacheConfig, Cacheable, DataMapper, DataSeq, LineReader, TabularCache, TextInput, cache_path,
};
use std::fs;
use std::path::Path;

fn people_seq(counter: &CountingProducer) -> DataSeq<Person> {
    let counter = counter.clone();
    DataSeq::defer(move || counter.produce(sample_people()).into_iter().map(Ok))
}

#[test]
fn second_call_replays_without_running_upstream() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let base = dir.file_path("people");
    let mapper = DataMapper::<Person>::new(",")?;
    let counter = CountingProducer::new();

    let first = people_seq(&counter).cache_csv(&base, &mapper)?;
    assert!(first.is_reusable());
    let first = first.to_vec()?;
    let second = people_seq(&counter).cache_csv(&base, &mapper)?.to_vec()?;

    assert_eq!(counter.calls(), 1);
    assert_eq!(first, sample_people());
    assert_eq!(second, first);
    assert!(dir.file_path("people.csv").is_file());
    Ok(())
}

#[test]
fn lazy_upstream_is_not_pulled_on_a_hit() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let base = dir.file_path("warm");
    let mapper = DataMapper::<Person>::new(",")?;
    mapper.writer().write(cache_path(&base, ".csv"), &sample_people())?;

    let counter = CountingProducer::new();
    let people = people_seq(&counter).cache_csv(&base, &mapper)?.to_vec()?;
    assert_eq!(people, sample_people());
    assert_eq!(counter.calls(), 0);
    Ok(())
}

#[test]
fn empty_results_are_not_cached() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let base = dir.file_path("nobody");
    let mapper = DataMapper::<Person>::new(",")?;
    let counter = CountingProducer::new();

    for _ in 0..2 {
        let c = counter.clone();
        let seq = DataSeq::defer(move || c.produce(Vec::<Person>::new()).into_iter().map(Ok));
        assert!(seq.cache_csv(&base, &mapper)?.to_vec()?.is_empty());
    }
    assert_eq!(counter.calls(), 2);
    assert!(!cache_path(&base, ".csv").exists());
    Ok(())
}

#[test]
fn upstream_errors_propagate_and_write_nothing() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let base = dir.file_path("broken");
    let mapper = DataMapper::<Person>::new(",")?;
    let seq = DataSeq::from_results(vec![
        Ok(sample_people()[0].clone()),
        Err(anyhow::anyhow!("upstream failed")),
    ]);

    let err = seq.cache_csv(&base, &mapper).err().expect("an error");
    assert!(format!("{err:#}").contains("upstream failed"));
    assert!(!cache_path(&base, ".csv").exists());
    Ok(())
}

#[test]
fn sessions_can_be_memoized() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let base = dir.file_path("from_session");
    let mapper = DataMapper::<Person>::new(";")?;

    let people = LineReader::csv::<Person>(",")?
        .read(TextInput::text(PEOPLE_CSV))
        .skip_lines(1)
        .cache_csv(&base, &mapper)?
        .to_vec()?;
    assert_eq!(people, sample_people());

    let written = fs::read_to_string(cache_path(&base, ".csv"))?;
    assert_eq!(written.lines().next(), Some("Ada;Female;36;1815001;1.65;true"));
    Ok(())
}

#[test]
fn header_caches_bind_by_name_on_replay() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let mapper = DataMapper::<Person>::new(",")?;
    let cache = TabularCache::new(dir.file_path("with_header"), mapper).with_config(CacheConfig {
        header: true,
        utf8_bom: true,
        ..CacheConfig::default()
    });
    let counter = CountingProducer::new();

    let first = people_seq(&counter).cache_by(&cache)?.to_vec()?;
    let second = people_seq(&counter).cache_by(&cache)?.to_vec()?;
    assert_eq!(first, second);
    assert_eq!(counter.calls(), 1);

    let written = fs::read_to_string(cache.path())?;
    assert!(written.starts_with("\u{feff}name,gender,age,id,height,active\n"));
    Ok(())
}

#[test]
fn suffix_is_not_doubled() {
    assert_eq!(
        cache_path("cache/people.csv", ".csv"),
        Path::new("cache/people.csv")
    );
    assert_eq!(cache_path("cache/people", ".csv"), Path::new("cache/people.csv"));
}

#[cfg(feature = "io-jsonl")]
mod jsonl {
    use super::*;
    use lineio::{JsonLinesCache, WriteMode};
    use std::time::{Duration, Instant};

    #[test]
    fn json_lines_cache_round_trips() -> anyhow::Result<()> {
        let dir = TempDirPath::new()?;
        let base = dir.file_path("people");
        let counter = CountingProducer::new();

        let first = people_seq(&counter).cache_jsonl(&base)?.to_vec()?;
        let second = people_seq(&counter).cache_jsonl(&base)?.to_vec()?;
        assert_eq!(first, second);
        assert_eq!(counter.calls(), 1);
        assert!(dir.file_path("people.jsonl").is_file());
        Ok(())
    }

    #[test]
    fn async_writes_land_eventually() -> anyhow::Result<()> {
        let dir = TempDirPath::new()?;
        let cache =
            JsonLinesCache::<Person>::new(dir.file_path("later")).write_mode(WriteMode::Async);
        let counter = CountingProducer::new();

        let people = people_seq(&counter).cache_by(&cache)?.to_vec()?;
        assert_eq!(people, sample_people());

        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let lines = fs::read_to_string(cache.path())
                .map(|text| text.lines().count())
                .unwrap_or(0);
            if lines == people.len() {
                break;
            }
            assert!(Instant::now() < deadline, "async cache write did not finish");
            std::thread::sleep(Duration::from_millis(20));
        }
        Ok(())
    }
}
