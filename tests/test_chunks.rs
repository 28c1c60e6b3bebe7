use swiftcsv::{parse, Config, Mode, Parser, Source};

#[test]
fn test_chunks() {
    let input_chunks = vec![
        &b"col_a,col_b,col_c\n0aaaa,0bbbb,0cccc\n1aaaa,1bbbb,1cc"[..],
        &b"cc\n"[..],
        &b"2aaaa,2bbbb"[..],
        &b",2cccc\n"[..],
        &b"3aaaa,3bbbb,3cccc\n4aaaa,4bbbb,4cccc\n5aaaa,5bb"[..],
        &b"bb,5cccc"[..],
        &b"\n"[..],
        &b"6aaa"[..],
    ];
    let mut parser = Parser::new(&Config::default()).unwrap();
    for chunk in input_chunks.iter() {
        parser.feed(chunk).unwrap();
    }
    let output = parser.finish().unwrap().rows;
    assert_eq!(output[0], vec!["col_a", "col_b", "col_c"]);
    assert_eq!(output[1], vec!["0aaaa", "0bbbb", "0cccc"]);
    assert_eq!(output[2], vec!["1aaaa", "1bbbb", "1cccc"]);
    assert_eq!(output[3], vec!["2aaaa", "2bbbb", "2cccc"]);
    assert_eq!(output[4], vec!["3aaaa", "3bbbb", "3cccc"]);
    assert_eq!(output[5], vec!["4aaaa", "4bbbb", "4cccc"]);
    assert_eq!(output[6], vec!["5aaaa", "5bbbb", "5cccc"]);
    assert_eq!(output[7], vec!["6aaa"]);
    assert_eq!(output.len(), 8);
}

/// Feed `data` to a parser split at every possible pair of offsets and
/// check the result never depends on where the splits fall.
fn check_all_splits(data: &[u8], config: &Config) {
    let want = parse(Source::Bytes(data), config, Mode::Eager)
        .unwrap()
        .into_eager()
        .unwrap();
    for i in 0..=data.len() {
        for j in i..=data.len() {
            let mut parser = Parser::new(config).unwrap();
            parser.feed(&data[..i]).unwrap();
            parser.feed(&data[i..j]).unwrap();
            parser.feed(&data[j..]).unwrap();
            let got = parser.finish().unwrap();
            assert_eq!(want, got, "split at {} and {}", i, j);
        }
    }
}

#[test]
fn splits_do_not_matter() {
    check_all_splits(
        b"a,\"b\"\"c\",d\r\n\"e\r\nf\",g\n\nh",
        &Config::default(),
    );
}

#[test]
fn splits_do_not_matter_with_dialect() {
    let config = Config {
        delimiter: b';',
        escape: Some(b'\\'),
        comment: Some(b'#'),
        trim: true,
        skip_empty_lines: true,
        ..Config::default()
    };
    check_all_splits(b"# skip; me\n a ; \"b;\\\"c\" \n\n d\\;e ;f", &config);
}

#[test]
fn splits_do_not_matter_relaxed() {
    let config = Config { relaxed: true, ..Config::default() };
    check_all_splits(b"\"a\"b,c\n\"d\"\re\n\"f", &config);
}
