// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A fake `/sys/fs/bcachefs` tree and usage report shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tempfile::TempDir;

pub const UUID: &str = "a9da1e6e-d4e5-4717-a520-408c8af4b084";

pub const USAGE_REPORT: &str = "\
Filesystem: a9da1e6e-d4e5-4717-a520-408c8af4b084
Size:                 89243210303488
Used:                 69551428518400
Online reserved:            13135872

Data type      Required/total  Durability    Devices
reserved:      1/2               [] 5181931520
btree:         1/2             2             [sdd sde]          1551368192
user:          1/2             2             [sdg sdi]        176730659328

Compression:
type              compressed    uncompressed     average extent size
zstd           3629187407872  10558477742080                  123627

Btree usage:
extents:        195974660096
inodes:          57868288000

Pending rebalance work:
8216518656

hdd.hdd1 (device 0):             sdd              rw    79%
                                data         buckets    fragmented
  free:                2320309420032         4425639
  sb:                        3149824               7        520192
  bucket size:                524288
";

pub const TIME_STAT: &str = "count:     484251
                       since mount        recent
duration of events
  min:                       88 us
  max:                        2 m
  total:                     47 h
  mean:                     353 ms         11 ms
  stddev:                     2 s           5 ms
time between events
  min:                       10 ns
  max:                        9 m
  mean:                     475 ms       1586 ms
  stddev:                  1909 ms       1679 us
";

pub const IO_DONE: &str = "read:
sb          :      856064
btree       :200642920448
user        :2338190483456
write:
sb          :     4088832
btree       : 10873405440
user        :746460282880
";

pub const IO_ERRORS: &str = "IO errors since filesystem creation
  read:    1
  write:   2
  checksum:3
IO errors since 7 y ago
  read:    0
  write:   0
  checksum:0
";

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

/// A complete filesystem directory with one device.
pub fn sysfs_tree() -> TempDir {
    let root = TempDir::new().unwrap();
    let fs_dir = root.path().join(UUID);
    fs::create_dir_all(&fs_dir).unwrap();

    write(&fs_dir, "btree_write_stats", "nr size\ninitial: 364286 118 KiB\n");
    write(&fs_dir, "btree_cache_size", "19.1 GiB\n");
    write(
        &fs_dir,
        "compression_stats",
        "typetype compressed uncompressed average extent size\nzstd 2.86 TiB 8.15 TiB 123 KiB\n",
    );
    write(
        &fs_dir,
        "rebalance_status",
        "scanning\n  rebalance_scan: data type==user pos=extents:1:4096:U32_MAX\n    keys moved:  74602530\n    keys raced:  0\n    bytes seen:  12.0 TiB\n    bytes moved: 3.57 TiB\n    bytes raced: 0 B\n\n",
    );

    let time_stats = fs_dir.join("time_stats");
    fs::create_dir(&time_stats).unwrap();
    write(&time_stats, "btree_node_read", TIME_STAT);

    let counters = fs_dir.join("counters");
    fs::create_dir(&counters).unwrap();
    write(
        &counters,
        "bucket_alloc",
        "since mount:                   1\nsince filesystem creation:     551\n",
    );

    let dev = fs_dir.join("dev-0");
    fs::create_dir(&dev).unwrap();
    write(&dev, "label", "hdd.hdd1\n");
    write(&dev, "uuid", "0fb7c3e2-2ef9-4b84-9a26-7b5ec84dba8b\n");
    write(&dev, "bucket_size", "512 KiB\n");
    write(&dev, "first_bucket", "1\n");
    write(&dev, "nbuckets", "3815447\n");
    write(&dev, "durability", "1\n");
    write(&dev, "io_done", IO_DONE);
    write(&dev, "io_errors", IO_ERRORS);
    write(&dev, "io_latency_stats_read", TIME_STAT);
    write(&dev, "io_latency_stats_write", TIME_STAT);

    root
}

/// Write the usage report to a file so `cat` can stand in for the bcachefs tool.
pub fn usage_report_file(dir: &TempDir) -> String {
    let path = dir.path().join("usage.txt");
    fs::write(&path, USAGE_REPORT).unwrap();
    path.to_string_lossy().into_owned()
}
