// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use std::sync::Arc;

use azure_blob_vfs::storage::config::{ACCOUNT_NAME, HTTP_STATS, READ_BUFFER_SIZE};
use azure_blob_vfs::storage::SharedStoreConnector;
use azure_blob_vfs::{AzureStorageFileSystem, OpenFlags, Session, Settings};
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStoreExt, PutPayload};

#[tokio::main]
async fn main() {
    // Containers are top-level prefixes of the in-memory store
    let store = InMemory::new();
    for (name, body) in [
        ("sales/2024/01/orders.csv", "id,amount\n1,10\n2,20\n"),
        ("sales/2024/02/orders.csv", "id,amount\n3,30\n"),
        ("sales/2024/02/orders.json", "[]"),
    ] {
        store
            .put(&Path::from(name), PutPayload::from(body.as_bytes().to_vec()))
            .await
            .unwrap();
    }

    let fs = AzureStorageFileSystem::with_connector(Arc::new(SharedStoreConnector::new(
        Arc::new(store),
    )));
    let session = Session::new(
        Settings::new()
            .with_option(ACCOUNT_NAME, "demo")
            .with_option(READ_BUFFER_SIZE, "8")
            .with_option(HTTP_STATS, "true"),
    );

    let paths = fs.glob("az://sales/**/*.csv", &session).await.unwrap();
    for path in &paths {
        let mut handle = fs.open_file(path, OpenFlags::READ, &session).await.unwrap();
        let mut contents = vec![0u8; handle.file_size() as usize];
        handle.read_at(&mut contents, 0).await.unwrap();
        println!("{}:\n{}", path, String::from_utf8_lossy(&contents));
    }

    println!("{:?}", session.stats().snapshot());
    session.end();
}
